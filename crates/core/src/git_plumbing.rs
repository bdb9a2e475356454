//! Thin wrapper around the Git binary and `git2` for the plumbing LFC
//! needs but deliberately does not reimplement: repository discovery and
//! ignore-rule-aware file enumeration.
//!
//! Per the design note "Walking the working tree" in the specification,
//! discovery of tracked sidecars should honor Git's own ignore rules by
//! calling `git ls-files` rather than re-parsing `.gitignore` glob syntax.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

/// Locate the working-tree root of the Git repository containing `start`.
pub fn discover_repo_root(start: &Path) -> Option<PathBuf> {
    git2::Repository::discover(start)
        .ok()
        .and_then(|repo| repo.workdir().map(|p| p.to_path_buf()))
}

/// List all paths tracked or known-untracked-but-not-ignored by Git
/// under `repo_root`, via `git ls-files --cached --others --exclude-standard`.
///
/// This lets the reconciler discover candidate sidecars without
/// re-implementing `.gitignore` glob semantics itself.
pub fn ls_files(repo_root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["ls-files", "--cached", "--others", "--exclude-standard", "-z"])
        .current_dir(repo_root)
        .output()?;

    if !output.status.success() {
        warn!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "git ls-files failed"
        );
        return Ok(Vec::new());
    }

    let paths = output
        .stdout
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(String::from_utf8_lossy(s).into_owned()))
        .collect();
    Ok(paths)
}

/// `true` if Git would ignore `path` (relative to `repo_root`) under its
/// current ignore rules.
pub fn is_ignored(repo_root: &Path, path: &Path) -> bool {
    match git2::Repository::open(repo_root) {
        Ok(repo) => repo.status_should_ignore(path).unwrap_or(false),
        Err(e) => {
            debug!(error = %e, "could not open repository to check ignore status");
            false
        }
    }
}
