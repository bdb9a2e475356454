use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use indicatif::ProgressBar;

use lfc_core::backend;
use lfc_core::reconciler::Reconciler;
use lfc_core::transfer::{new_shutdown_flag, watch_for_shutdown, Direction, Outcome, TransferEngine};

use super::{open_repo, Context};
use crate::style;

pub async fn run(ctx: &Context, _paths: &[PathBuf]) -> Result<ExitCode> {
    let (repo, cache) = open_repo()?;
    let config = repo.config()?;
    let (_, spec) = config.resolve_remote(ctx.remote.as_deref())?;

    let engine = TransferEngine::new(ctx.jobs.unwrap_or(4));
    let hashes = engine.resolve_hash_set(&repo, &cache, Direction::Pull)?;

    if hashes.is_empty() {
        if !ctx.quiet {
            println!("{}", style::dim("nothing to pull"));
        }
    } else {
        let backend: Arc<dyn lfc_core::backend::RemoteBackend> = Arc::from(backend::open(&spec.url)?);
        let shutdown = new_shutdown_flag();
        watch_for_shutdown(shutdown.clone());

        let bar = spinner(ctx, hashes.len());
        let summary = engine.run(Direction::Pull, backend, cache.clone(), hashes, shutdown).await;
        bar.finish_and_clear();

        let mut corrupt = false;
        for result in &summary.results {
            if let Outcome::Failed(reason) = &result.outcome {
                corrupt |= reason.contains("corrupt");
                eprintln!("{}", style::error(&format!("{} {}", &result.hash[..12], reason)));
            } else if !ctx.quiet {
                println!("{} {:?}", &result.hash[..12], result.outcome);
            }
        }

        if !summary.all_succeeded() {
            return Ok(if corrupt { super::exit::corruption() } else { super::exit::transfer_failure() });
        }
    }

    let reconciler = Reconciler::new(repo.root(), &cache, config.hash_check).with_umask(config.umask);
    for path in repo.walk_tracked_files().into_iter().filter(|p| lfc_core::pointer::is_sidecar(p)) {
        if let Some(original) = lfc_core::pointer::original_of(&path) {
            let _ = reconciler.checkout(&original);
        }
    }

    Ok(super::exit::success())
}

/// A steady-tick spinner for the duration of a transfer batch. The
/// engine reports results only once the whole batch completes, so this
/// shows activity without claiming per-blob progress it can't observe.
fn spinner(ctx: &Context, total: usize) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_message(format!("pulling {total} blob(s)..."));
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
