//! Subcommand implementations, one module per CLI verb.

pub mod add;
pub mod checkout;
pub mod clone;
pub mod config;
pub mod init;
pub mod ls_remote;
pub mod pull;
pub mod push;
pub mod remote;
pub mod show;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use lfc_core::cache::Cache;
use lfc_core::config::TrackingMode;
use lfc_core::repo::Repository;

/// Global flags shared by every subcommand.
pub struct Context {
    pub remote: Option<String>,
    pub jobs: Option<usize>,
    pub mode: TrackingMode,
    pub force: bool,
    pub quiet: bool,
}

/// Discover the LFC repository rooted above the current directory and
/// open its cache. Every subcommand but `init` and `clone` starts here.
pub fn open_repo() -> Result<(Repository, Cache)> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let repo = Repository::discover(&cwd).context("not an LFC repository (run 'lfc init' first)")?;
    let cache = repo.cache().context("failed to open local cache")?;
    Ok((repo, cache))
}

/// Make `path` (as given on the command line, relative to the current
/// directory) relative to the repository root.
pub fn relative_to_repo(repo: &Repository, path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let abs = cwd.join(path);
    abs.strip_prefix(repo.root())
        .map(|p| p.to_path_buf())
        .context("path is outside the repository")
}

/// Exit codes per the CLI's external interface contract: 0 success, 1
/// generic failure (mapped by `main`'s top-level error handler), 2
/// usage error, 3 transfer failure with at least one per-object
/// failure, 4 corruption detected.
pub mod exit {
    use std::process::ExitCode;

    pub fn success() -> ExitCode {
        ExitCode::SUCCESS
    }
    pub fn usage_error() -> ExitCode {
        ExitCode::from(2)
    }
    pub fn transfer_failure() -> ExitCode {
        ExitCode::from(3)
    }
    pub fn corruption() -> ExitCode {
        ExitCode::from(4)
    }
}
