//! Working-tree reconciler: `add`, `checkout`, `status`.
//!
//! Maps between sidecars (`<path>.lfc`) and the working-tree files they
//! describe, deciding for each one whether to materialize, re-hash, or
//! re-emit a pointer.

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::cache::Cache;
use crate::config::{HashCheckPolicy, TrackingMode};
use crate::errors::ReconcileError;
use crate::gitignore;
use crate::pointer::{self, PointerRecord};

/// How a cache blob was realized as a working-tree file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeMethod {
    Hardlink,
    Reflink,
    Copy,
}

/// Classification of a sidecar's working-tree state, produced by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Original file present and its hash matches the sidecar.
    Materialized,
    /// Blob is in cache but the working-tree file is absent.
    CachedOnly,
    /// Blob is absent from both the working tree and the local cache.
    Missing,
    /// The working-tree file's hash no longer matches the sidecar.
    Modified,
}

impl ReconcileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Materialized => "materialized",
            Self::CachedOnly => "cached-only",
            Self::Missing => "missing",
            Self::Modified => "modified",
        }
    }
}

/// One entry in a `status()` report.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub path: PathBuf,
    pub status: ReconcileStatus,
    pub hash: String,
}

/// Probes, once per process, whether the cache directory and a given
/// target directory support hardlinks, memoizing the result. Reflink is
/// always reported unavailable (see DESIGN.md's Open Question #3): no
/// reflink syscall is exposed by the crates this workspace depends on,
/// so the policy degrades cleanly to copy.
#[derive(Default)]
pub struct MaterializationPolicy {
    hardlink_supported: Cell<Option<bool>>,
}

impl MaterializationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn probe_hardlink(&self, cache_dir: &Path, target_dir: &Path) -> bool {
        if let Some(cached) = self.hardlink_supported.get() {
            return cached;
        }
        let probe_src = cache_dir.join(".lfc-hardlink-probe");
        let probe_dst = target_dir.join(".lfc-hardlink-probe");
        let supported = fs::write(&probe_src, b"probe")
            .and_then(|_| fs::hard_link(&probe_src, &probe_dst))
            .is_ok();
        let _ = fs::remove_file(&probe_src);
        let _ = fs::remove_file(&probe_dst);
        self.hardlink_supported.set(Some(supported));
        debug!(supported, "probed hardlink support");
        supported
    }

    /// Materialize `cache_path` (an existing cache blob) as `target`,
    /// respecting `umask` for the permissions of a standalone copy.
    ///
    /// A hardlinked target shares the cache blob's inode, so it is left
    /// at the blob's own read-only permissions rather than chmod'd u+rw
    /// -- doing otherwise would make the cache blob itself writable.
    pub fn materialize(
        &self,
        cache_dir: &Path,
        cache_path: &Path,
        target: &Path,
        umask: Option<u32>,
    ) -> io::Result<MaterializeMethod> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if target.exists() {
            fs::remove_file(target)?;
        }

        let target_dir = target.parent().unwrap_or_else(|| Path::new("."));
        if self.probe_hardlink(cache_dir, target_dir) {
            if fs::hard_link(cache_path, target).is_ok() {
                return Ok(MaterializeMethod::Hardlink);
            }
        }

        fs::copy(cache_path, target)?;
        set_permissions(target, umask)?;
        Ok(MaterializeMethod::Copy)
    }
}

/// Apply u+rw (respecting `umask`) to a standalone materialized copy.
#[cfg(unix)]
fn set_permissions(path: &Path, umask: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = 0o666 & !umask.unwrap_or(0o022);
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(path: &Path, _umask: Option<u32>) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

/// The working-tree reconciler.
pub struct Reconciler<'a> {
    repo_root: &'a Path,
    cache: &'a Cache,
    policy: MaterializationPolicy,
    hash_check: HashCheckPolicy,
    umask: Option<u32>,
}

impl<'a> Reconciler<'a> {
    pub fn new(repo_root: &'a Path, cache: &'a Cache, hash_check: HashCheckPolicy) -> Self {
        Self {
            repo_root,
            cache,
            policy: MaterializationPolicy::new(),
            hash_check,
            umask: None,
        }
    }

    /// Apply the repository's configured `umask` when materializing
    /// standalone copies.
    pub fn with_umask(mut self, umask: Option<u32>) -> Self {
        self.umask = umask;
        self
    }

    /// Track `path`: hash its contents, store the blob, write its
    /// sidecar, and ensure it is ignored by Git. A no-op if the sidecar
    /// already reflects the file's current hash.
    #[instrument(skip(self))]
    pub fn add(&self, path: &Path, mode: TrackingMode) -> Result<PointerRecord, ReconcileError> {
        let abs_path = self.repo_root.join(path);
        let sidecar_path = pointer::sidecar_path_for(&abs_path);

        if let Ok(existing) = pointer::read(&sidecar_path) {
            let current_hash = hash_file(&abs_path)?;
            if current_hash == existing.sha256 {
                debug!(path = %path.display(), "unchanged, add is a no-op");
                return Ok(existing);
            }
        }

        let file = fs::File::open(&abs_path)?;
        let (hash, size) = self.cache.store(file)?;

        let rel = path.to_string_lossy().replace('\\', "/");
        let record = PointerRecord::new(hash, size).with_path(rel.clone());
        pointer::write(&sidecar_path, &record)?;
        gitignore::ensure_tracked_file_ignored(self.repo_root, &rel)?;

        match mode {
            TrackingMode::Pointer => {
                let _ = fs::remove_file(&abs_path);
            }
            TrackingMode::Link | TrackingMode::Copy => {
                // Leave the original in place; it already holds the
                // bytes now durably stored in the cache.
            }
        }

        info!(path = %path.display(), hash = %record.sha256, "added");
        Ok(record)
    }

    /// Ensure the original file for `path`'s sidecar is present in the
    /// working tree, per the materialization policy in the design.
    /// Returns `Err(ReconcileError::MissingBlob)` if the cache doesn't
    /// have the blob -- callers (e.g. `pull`) should fall through to the
    /// transfer engine in that case.
    #[instrument(skip(self))]
    pub fn checkout(&self, path: &Path) -> Result<Option<MaterializeMethod>, ReconcileError> {
        let abs_path = self.repo_root.join(path);
        let sidecar_path = pointer::sidecar_path_for(&abs_path);
        let record = pointer::read(&sidecar_path)?;

        if abs_path.is_file() {
            let current_hash = hash_file(&abs_path)?;
            if current_hash == record.sha256 {
                debug!(path = %path.display(), "already materialized and unchanged");
                return Ok(None);
            }
        }

        let cache_path = self.cache.path_of(&record.sha256);
        if !cache_path.is_file() {
            return Err(ReconcileError::MissingBlob {
                path: path.display().to_string(),
                hash: record.sha256,
            });
        }

        let method = self.policy.materialize(self.cache.root(), &cache_path, &abs_path, self.umask)?;
        info!(path = %path.display(), method = ?method, "materialized");
        Ok(Some(method))
    }

    /// Classify every sidecar under `paths` (or, if empty, discovered by
    /// `walker`) against the working tree and cache.
    pub fn status(&self, sidecars: &[PathBuf]) -> Vec<StatusEntry> {
        let mut entries = Vec::new();
        for sidecar in sidecars {
            let abs_sidecar = self.repo_root.join(sidecar);
            let Ok(record) = pointer::read(&abs_sidecar) else {
                warn!(path = %sidecar.display(), "skipping unparsable sidecar");
                continue;
            };
            let Some(original) = pointer::original_of(sidecar) else {
                continue;
            };
            let abs_original = self.repo_root.join(&original);

            let status = if abs_original.is_file() {
                match self.check_materialized(&abs_original, &record) {
                    Ok(true) => ReconcileStatus::Materialized,
                    Ok(false) => ReconcileStatus::Modified,
                    Err(_) => ReconcileStatus::Modified,
                }
            } else if self.cache.has(&record.sha256) {
                ReconcileStatus::CachedOnly
            } else {
                ReconcileStatus::Missing
            };

            entries.push(StatusEntry {
                path: original,
                status,
                hash: record.sha256,
            });
        }
        entries
    }

    fn check_materialized(&self, abs_path: &Path, record: &PointerRecord) -> io::Result<bool> {
        match self.hash_check {
            HashCheckPolicy::Never => Ok(true),
            HashCheckPolicy::Size => {
                let size = fs::metadata(abs_path)?.len();
                Ok(size == record.size)
            }
            HashCheckPolicy::Always => {
                let hash = hash_file(abs_path)?;
                Ok(hash == record.sha256)
            }
        }
    }
}

/// Hash a file's full contents with SHA-256, streaming.
pub fn hash_file(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::io::Read;
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
