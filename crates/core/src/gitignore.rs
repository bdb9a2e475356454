//! `.gitignore` maintenance.
//!
//! LFC keeps two separate ignore files consistent:
//! - `.lfc/.gitignore` always contains `cache/` so Git never tracks the
//!   blob store (invariant I3).
//! - The repository's root `.gitignore` gets one line per tracked
//!   large-file path so the original bytes are never accidentally
//!   staged alongside their sidecar (invariant I4).
//!
//! Both operations are idempotent: re-running them when the pattern is
//! already present is a no-op.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

/// Ensure `pattern` is present as its own line in the `.gitignore` file
/// at `gitignore_path`. Returns `true` if a new line was appended.
pub fn ensure_ignored(gitignore_path: &Path, pattern: &str) -> std::io::Result<bool> {
    let existing = if gitignore_path.exists() {
        fs::read_to_string(gitignore_path)?
    } else {
        String::new()
    };

    for line in existing.lines() {
        if line.trim() == pattern {
            debug!(pattern, path = %gitignore_path.display(), "already ignored");
            return Ok(false);
        }
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(gitignore_path)?;

    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{pattern}")?;

    info!(pattern, path = %gitignore_path.display(), "added ignore entry");
    Ok(true)
}

/// Ensure `.lfc/.gitignore` exists and ignores `cache/` (invariant I3).
pub fn ensure_cache_ignored(lfc_dir: &Path) -> std::io::Result<bool> {
    ensure_ignored(&lfc_dir.join(".gitignore"), "cache/")
}

/// Ensure the repository root `.gitignore` ignores the given tracked
/// file's original path (invariant I4).
pub fn ensure_tracked_file_ignored(repo_root: &Path, tracked_path: &str) -> std::io::Result<bool> {
    ensure_ignored(&repo_root.join(".gitignore"), tracked_path)
}
