use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use lfc_core::backend;
use lfc_core::git::GitClient;
use lfc_core::repo::Repository;
use lfc_core::transfer::{new_shutdown_flag, Direction, TransferEngine};

use super::Context;
use crate::style;

pub async fn run(ctx: &Context, git_url: &str, dir: Option<&Path>) -> Result<ExitCode> {
    let dest = dir.map(PathBuf::from).unwrap_or_else(|| default_clone_dir(git_url));
    if dest.exists() && !ctx.force {
        bail!("destination '{}' already exists (use --force to clone anyway)", dest.display());
    }

    GitClient::clone_repo(git_url, &dest, None).context("git clone failed")?;
    let repo = Repository::init(&dest).context("failed to initialize LFC in the cloned repository")?;
    let cache = repo.cache()?;

    if !ctx.quiet {
        println!("{}", style::success(&format!("cloned {git_url} into {}", dest.display())));
    }

    let config = repo.config()?;
    let Ok((_, spec)) = config.resolve_remote(ctx.remote.as_deref()) else {
        if !ctx.quiet {
            println!("{}", style::dim("no LFC remote configured; skipping blob pull"));
        }
        return Ok(super::exit::success());
    };

    let engine = TransferEngine::new(ctx.jobs.unwrap_or(4));
    let hashes = engine.resolve_hash_set(&repo, &cache, Direction::Clone)?;
    let backend: Arc<dyn lfc_core::backend::RemoteBackend> = Arc::from(backend::open(&spec.url)?);
    let summary = engine.run(Direction::Clone, backend, cache, hashes, new_shutdown_flag()).await;

    for result in &summary.results {
        if !ctx.quiet {
            println!("{} {:?}", &result.hash[..12], result.outcome);
        }
    }

    if summary.all_succeeded() {
        Ok(super::exit::success())
    } else {
        eprintln!("{}", style::warn(&format!("{} blob(s) failed to pull", summary.failed_count())));
        Ok(super::exit::transfer_failure())
    }
}

fn default_clone_dir(git_url: &str) -> PathBuf {
    let name = git_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(git_url)
        .trim_end_matches(".git");
    PathBuf::from(name)
}
