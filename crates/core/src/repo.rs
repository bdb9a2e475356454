//! Repository state: discovery, initialization, and remote management.
//!
//! An LFC repository is a Git working tree with a `.lfc/` directory at
//! its root, holding the cache, config, and `.lfc/.gitignore`.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cache::Cache;
use crate::config::{RemoteSpec, RepoConfig};
use crate::errors::RepoError;
use crate::git_plumbing;
use crate::gitignore;

/// Default on-disk layout, relative to the repository root.
pub const LFC_DIR: &str = ".lfc";
pub const CACHE_SUBDIR: &str = "cache";
pub const CONFIG_FILE: &str = "config";

/// A handle to an initialized LFC repository. No process-wide
/// singletons: every operation takes an explicit `&Repository`.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    lfc_dir: PathBuf,
    config_path: PathBuf,
}

impl Repository {
    /// Open an already-initialized repository, searching upward from
    /// `start` for a `.lfc` directory the way Git searches for `.git`.
    pub fn discover(start: &Path) -> Result<Self, RepoError> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(LFC_DIR);
            if candidate.is_dir() {
                return Ok(Self::at(&dir).apply_env_overrides());
            }
            if !dir.pop() {
                return Err(RepoError::NotARepo(start.display().to_string()));
            }
        }
    }

    /// Construct a handle for a repository known to be rooted at `root`,
    /// without checking that `.lfc` exists (used by `init`).
    fn at(root: &Path) -> Self {
        let lfc_dir = root.join(LFC_DIR);
        Self {
            root: root.to_path_buf(),
            config_path: lfc_dir.join(CONFIG_FILE),
            lfc_dir,
        }
    }

    /// Resolve the environment overrides (`LFC_CACHE_DIR`, `LFC_CONFIG`)
    /// on top of a discovered or newly initialized repository.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("LFC_CONFIG") {
            self.config_path = PathBuf::from(dir);
        }
        self
    }

    /// Initialize a new LFC repository at `root`. Idempotent: running
    /// `init` on an existing repository preserves its config.
    pub fn init(root: &Path) -> Result<Self, RepoError> {
        let repo = Self::at(root).apply_env_overrides();
        std::fs::create_dir_all(&repo.lfc_dir)?;
        std::fs::create_dir_all(repo.cache_dir())?;
        gitignore::ensure_cache_ignored(&repo.lfc_dir)?;

        if !repo.config_path.exists() {
            RepoConfig::default().save(&repo.config_path)?;
            info!(path = %repo.root.display(), "initialized LFC repository");
        } else {
            info!(path = %repo.root.display(), "LFC repository already initialized");
        }

        Ok(repo)
    }

    /// Repository (working-tree) root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the cache directory, honoring `LFC_CACHE_DIR`.
    pub fn cache_dir(&self) -> PathBuf {
        std::env::var("LFC_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| self.lfc_dir.join(CACHE_SUBDIR))
    }

    /// Path to the config file, honoring `LFC_CONFIG`.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Open this repository's content-addressed cache.
    pub fn cache(&self) -> Result<Cache, RepoError> {
        Cache::open(self.cache_dir()).map_err(|e| match e {
            crate::errors::CacheError::Io(io) => RepoError::Io(io),
            other => RepoError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
        })
    }

    /// Load the current repository configuration.
    pub fn config(&self) -> Result<RepoConfig, RepoError> {
        RepoConfig::load(&self.config_path)
    }

    /// Persist a modified configuration.
    pub fn save_config(&self, config: &RepoConfig) -> Result<(), RepoError> {
        config.save(&self.config_path)
    }

    /// Add a new named remote.
    pub fn remote_add(&self, name: &str, url: &str, make_default: bool) -> Result<(), RepoError> {
        let mut config = self.config()?;
        if config.remote.contains_key(name) {
            return Err(RepoError::RemoteExists(name.to_string()));
        }
        config.remote.insert(
            name.to_string(),
            RemoteSpec {
                url: url.to_string(),
                kind_hint: None,
            },
        );
        if make_default || config.default_remote.is_none() {
            config.default_remote = Some(name.to_string());
        }
        self.save_config(&config)
    }

    /// Remove a named remote.
    pub fn remote_remove(&self, name: &str) -> Result<(), RepoError> {
        let mut config = self.config()?;
        if config.remote.remove(name).is_none() {
            return Err(RepoError::RemoteNotFound(name.to_string()));
        }
        if config.default_remote.as_deref() == Some(name) {
            config.default_remote = None;
        }
        self.save_config(&config)
    }

    /// Change a remote's URL.
    pub fn remote_set_url(&self, name: &str, url: &str) -> Result<(), RepoError> {
        let mut config = self.config()?;
        let spec = config
            .remote
            .get_mut(name)
            .ok_or_else(|| RepoError::RemoteNotFound(name.to_string()))?;
        spec.url = url.to_string();
        self.save_config(&config)
    }

    /// List all configured remotes, sorted by name.
    pub fn remote_list(&self) -> Result<Vec<(String, RemoteSpec)>, RepoError> {
        let config = self.config()?;
        Ok(config.remote.into_iter().collect())
    }

    /// Enumerate candidate working-tree paths via `git ls-files`.
    pub fn walk_tracked_files(&self) -> Vec<PathBuf> {
        git_plumbing::ls_files(&self.root).unwrap_or_default()
    }
}
