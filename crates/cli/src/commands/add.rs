use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use super::{open_repo, relative_to_repo, Context};
use crate::style;
use lfc_core::reconciler::Reconciler;

pub fn run(ctx: &Context, paths: &[PathBuf]) -> Result<ExitCode> {
    let (repo, cache) = open_repo()?;
    let config = repo.config()?;
    let reconciler = Reconciler::new(repo.root(), &cache, config.hash_check);

    for path in paths {
        let rel = relative_to_repo(&repo, path)?;
        let record = reconciler.add(&rel, ctx.mode)?;
        if !ctx.quiet {
            println!("{}", style::success(&format!("{} ({})", rel.display(), &record.sha256[..12])));
        }
    }
    Ok(super::exit::success())
}
