use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use lfc_core::pointer;

use super::{open_repo, relative_to_repo, Context};

pub fn run(ctx: &Context, path: &PathBuf) -> Result<ExitCode> {
    let (repo, _cache) = open_repo()?;
    let rel = relative_to_repo(&repo, path)?;
    let sidecar = repo.root().join(pointer::sidecar_path_for(&rel));
    let record = pointer::read(&sidecar).context("no sidecar found for this path")?;

    if ctx.quiet {
        println!("{}", record.sha256);
    } else {
        println!("sha256: {}", record.sha256);
        println!("size:   {}", record.size);
    }
    Ok(super::exit::success())
}
