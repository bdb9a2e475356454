//! Error types for the LFC core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`LfcError`] enum unifies them all for callers that want a
//! single error type. Variants map onto the error taxonomy (kinds, not
//! type names): usage, not-a-repo, io, parse, missing-blob, transient,
//! permanent, corrupt, conflict.

use thiserror::Error;

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum LfcError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

// ---------------------------------------------------------------------------
// Cache / hasher errors
// ---------------------------------------------------------------------------

/// Errors from the content-addressed cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Generic I/O error while reading/writing cache files.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested blob is not present in the local cache.
    #[error("blob {0} not found in local cache")]
    Missing(String),

    /// A digest mismatch was detected during verified `open` or a promote.
    #[error("cache corruption: expected digest {expected}, computed {computed}")]
    Corrupt { expected: String, computed: String },
}

// ---------------------------------------------------------------------------
// Pointer-record codec errors
// ---------------------------------------------------------------------------

/// Errors from parsing or writing a pointer-record sidecar.
#[derive(Debug, Error)]
pub enum PointerError {
    #[error("sidecar I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field (`sha256` or `size`) was missing.
    #[error("malformed sidecar at '{path}': missing required field '{field}'")]
    MissingField { path: String, field: String },

    /// A field had the wrong shape (e.g. `size` not an integer).
    #[error("malformed sidecar at '{path}': invalid value for field '{field}': {detail}")]
    InvalidField {
        path: String,
        field: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Reconciler errors
// ---------------------------------------------------------------------------

/// Errors from working-tree reconciliation (add / checkout / status).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("reconciler I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    /// Materialization was requested but the blob is absent both locally
    /// and the caller did not fall through to a transfer.
    #[error("blob {hash} for '{path}' is not present in the local cache")]
    MissingBlob { path: String, hash: String },

    /// The working-tree file's content no longer matches its sidecar.
    #[error("'{path}' has been modified: working tree hash {actual} != sidecar hash {expected}")]
    Modified {
        path: String,
        expected: String,
        actual: String,
    },
}

// ---------------------------------------------------------------------------
// Repository state errors
// ---------------------------------------------------------------------------

/// Errors from repository discovery, initialization, and config management.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not an LFC repository (no .lfc directory found above '{0}')")]
    NotARepo(String),

    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("remote '{0}' not found")]
    RemoteNotFound(String),

    #[error("remote '{0}' already exists")]
    RemoteExists(String),

    #[error("no default remote configured (use -r/--remote or 'lfc remote add --default')")]
    NoDefaultRemote,

    #[error("failed to acquire config lock at '{0}': {1}")]
    LockFailed(String, String),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Remote backend errors
// ---------------------------------------------------------------------------

/// Errors from a remote backend, classified at the transport boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested hash is absent at the remote.
    #[error("blob {0} not found at remote")]
    Missing(String),

    /// A transient failure (timeout, temporary network blip) -- retryable.
    #[error("transient backend error: {0}")]
    Transient(String),

    /// A permanent failure (refused connection, 4xx other than 404).
    #[error("permanent backend error: {0}")]
    Permanent(String),

    /// Authentication was rejected.
    #[error("backend authentication failed: {0}")]
    Auth(String),

    /// The backend URL scheme/spec could not be understood.
    #[error("unsupported or malformed remote URL: {0}")]
    InvalidUrl(String),

    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// `true` if retrying the same operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transient(_))
    }
}

// ---------------------------------------------------------------------------
// Transfer engine errors
// ---------------------------------------------------------------------------

/// Errors from the transfer engine (push / pull / clone orchestration).
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    /// A digest mismatch was detected while pulling a blob.
    #[error("corrupt transfer for {hash}: expected digest did not match received bytes")]
    Corrupt { hash: String },

    /// One or more per-hash transfers failed; the batch itself completed.
    #[error("{failed} of {total} transfer(s) failed")]
    PartialFailure { failed: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = CacheError::Missing("abc123".into());
        assert_eq!(err.to_string(), "blob abc123 not found in local cache");

        let err = RepoError::RemoteNotFound("origin".into());
        assert_eq!(err.to_string(), "remote 'origin' not found");

        let err = BackendError::Transient("timed out".into());
        assert!(err.is_retryable());
        let err2 = BackendError::Permanent("refused".into());
        assert!(!err2.is_retryable());
    }

    #[test]
    fn test_lfc_error_from_subsystem() {
        let cache_err = CacheError::Missing("x".into());
        let lfc_err: LfcError = cache_err.into();
        assert!(matches!(lfc_err, LfcError::Cache(_)));
    }
}
