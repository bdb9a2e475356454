//! Thin wrapper around `git2` for the one Git-level operation LFC needs
//! beyond plumbing: cloning a fresh working tree for `lfc clone`.
//!
//! Everything else LFC does against a Git repository (enumerating
//! tracked paths, checking ignore status) goes through
//! [`crate::git_plumbing`] instead, which shells out to `git` directly
//! rather than carrying the rest of `git2`'s write API.

use std::path::{Path, PathBuf};

use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use tracing::{info, instrument};

use crate::errors::RepoError;

/// A handle to a cloned or opened Git working tree.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn open<P: AsRef<Path>>(repo_path: P) -> Result<Self, RepoError> {
        let path = repo_path.as_ref();
        let repo = Repository::open(path)?;
        Ok(Self { repo, repo_path: path.to_path_buf() })
    }

    /// Clone `url` into `path`, optionally authenticating with a token
    /// (sent as the HTTPS password, username `x-access-token`).
    #[instrument(skip(token), fields(url = %url, path = %path.display()))]
    pub fn clone_repo(url: &str, path: &Path, token: Option<&str>) -> Result<Self, RepoError> {
        info!("cloning git repository");
        let mut callbacks = RemoteCallbacks::new();
        if let Some(tok) = token {
            let tok = tok.to_string();
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext("x-access-token", &tok)
            });
        }
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        let repo = builder.clone(url, path)?;
        info!("clone completed");
        Ok(Self { repo, repo_path: path.to_path_buf() })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }
}
