use std::process::ExitCode;

use anyhow::Result;

use lfc_core::backend::{self, RemoteBackend as _};

use super::{open_repo, Context};
use crate::style;

pub fn run(ctx: &Context, name: &str) -> Result<ExitCode> {
    let (repo, _cache) = open_repo()?;
    let config = repo.config()?;
    let (_, spec) = config.resolve_remote(Some(name))?;
    let remote = backend::open(&spec.url)?;

    let hashes = remote.list()?;
    if hashes.is_empty() {
        if !ctx.quiet {
            println!("{}", style::dim("remote has no blobs, or does not support listing"));
        }
    } else {
        for hash in hashes {
            println!("{hash}");
        }
    }
    Ok(super::exit::success())
}
