use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use indicatif::ProgressBar;

use lfc_core::backend;
use lfc_core::transfer::{new_shutdown_flag, watch_for_shutdown, Direction, TransferEngine};

use super::{open_repo, Context};
use crate::style;

pub async fn run(ctx: &Context, _paths: &[PathBuf]) -> Result<ExitCode> {
    let (repo, cache) = open_repo()?;
    let config = repo.config()?;
    let (_, spec) = config.resolve_remote(ctx.remote.as_deref())?;

    let engine = TransferEngine::new(ctx.jobs.unwrap_or(4));
    let hashes = engine.resolve_hash_set(&repo, &cache, Direction::Push)?;

    if hashes.is_empty() {
        if !ctx.quiet {
            println!("{}", style::dim("nothing to push"));
        }
        return Ok(super::exit::success());
    }

    let backend: Arc<dyn lfc_core::backend::RemoteBackend> = Arc::from(backend::open(&spec.url)?);
    let shutdown = new_shutdown_flag();
    watch_for_shutdown(shutdown.clone());

    let bar = spinner(ctx, hashes.len());
    let summary = engine.run(Direction::Push, backend, cache, hashes, shutdown).await;
    bar.finish_and_clear();

    for result in &summary.results {
        if !ctx.quiet {
            println!("{} {:?}", &result.hash[..12], result.outcome);
        }
        if let lfc_core::transfer::Outcome::Failed(reason) = &result.outcome {
            eprintln!("{}", style::error(&format!("{} {}", &result.hash[..12], reason)));
        }
    }

    if summary.all_succeeded() {
        Ok(super::exit::success())
    } else {
        Ok(super::exit::transfer_failure())
    }
}

fn spinner(ctx: &Context, total: usize) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_message(format!("pushing {total} blob(s)..."));
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
