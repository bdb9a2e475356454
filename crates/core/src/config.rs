//! TOML-based repository configuration for `.lfc/config`.
//!
//! The config holds the remote list, the default remote, and a handful
//! of behavioural flags. Writes are atomic: the new content is written
//! to a temp file in the same directory and renamed into place, guarded
//! by an exclusive `.lfc/config.lock` held only for that window.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::RepoError;

/// When to re-hash a materialized file to detect local modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashCheckPolicy {
    /// Always re-hash on reconciliation.
    Always,
    /// Only compare file size against the sidecar (cheaper, weaker).
    #[default]
    Size,
    /// Never re-check; trust that nothing touched the file.
    Never,
}

/// How `add` leaves the original file in the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Replace the working-tree file with a pointer only.
    Pointer,
    /// Keep the original file, linked to the cache copy (default).
    #[default]
    Link,
    /// Keep the original file as an independent copy.
    Copy,
}

/// Connection details for a single named remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSpec {
    /// The remote's address: a local path, `user@host:path`, or an
    /// `http(s)://` URL.
    pub url: String,
    /// Optional explicit backend kind, overriding scheme sniffing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind_hint: Option<String>,
}

/// Top-level `.lfc/config` contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Named remotes, keyed by remote name.
    #[serde(default)]
    pub remote: BTreeMap<String, RemoteSpec>,

    /// The remote used when `-r/--remote` is not given.
    #[serde(default, rename = "default-remote", skip_serializing_if = "Option::is_none")]
    pub default_remote: Option<String>,

    /// Whether `checkout`/`pull` should materialize files automatically.
    #[serde(default = "default_auto_pull", rename = "auto-pull")]
    pub auto_pull: bool,

    /// Reconciliation re-hash policy.
    #[serde(default, rename = "hash-check")]
    pub hash_check: HashCheckPolicy,

    /// Permission mask applied to materialized files, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umask: Option<u32>,
}

fn default_auto_pull() -> bool {
    false
}

impl RepoConfig {
    /// Load the config from `path`. Returns defaults if the file does
    /// not exist, matching `init`'s idempotence requirement.
    pub fn load(path: &Path) -> Result<Self, RepoError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(RepoError::Io)?;
        let config: RepoConfig = toml::from_str(&text)?;
        debug!(path = %path.display(), "loaded repository config");
        Ok(config)
    }

    /// Atomically write the config to `path`, guarded by a sibling
    /// `.lock` file held only for the write+rename window.
    pub fn save(&self, path: &Path) -> Result<(), RepoError> {
        let lock_path = path.with_extension("lock");
        let _lock = ConfigLock::acquire(&lock_path)?;

        let text = toml::to_string_pretty(self)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".config-")
            .tempfile_in(dir)
            .map_err(RepoError::Io)?;
        use std::io::Write;
        tmp.write_all(text.as_bytes()).map_err(RepoError::Io)?;
        tmp.persist(path).map_err(|e| RepoError::Io(e.error))?;

        info!(path = %path.display(), "wrote repository config");
        Ok(())
    }

    /// Look up a remote by name, falling back to the default remote
    /// when `name` is `None`.
    pub fn resolve_remote<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a RemoteSpec), RepoError> {
        let name = match name {
            Some(n) => n,
            None => self
                .default_remote
                .as_deref()
                .ok_or(RepoError::NoDefaultRemote)?,
        };
        let spec = self
            .remote
            .get(name)
            .ok_or_else(|| RepoError::RemoteNotFound(name.to_string()))?;
        Ok((name, spec))
    }
}

/// An advisory exclusive lock implemented via atomic create-exclusive
/// file semantics, held only for the duration of a config write. This
/// avoids pulling in a dedicated file-locking crate: the same
/// create-exclusive-or-fail primitive that makes the cache's
/// temp+rename pattern safe is sufficient here too.
struct ConfigLock {
    path: std::path::PathBuf,
}

impl ConfigLock {
    fn acquire(path: &Path) -> Result<Self, RepoError> {
        match fs::OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(_) => Ok(Self { path: path.to_path_buf() }),
            Err(e) => Err(RepoError::LockFailed(path.display().to_string(), e.to_string())),
        }
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
