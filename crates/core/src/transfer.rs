//! Transfer engine: push/pull/clone orchestration across a remote backend.
//!
//! Resolves a hash set, skips hashes the destination already has,
//! dispatches the rest with bounded concurrency, retries transient
//! failures with exponential backoff, and reports a deterministic
//! (sorted-by-hash) summary. A per-task failure never aborts the batch.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::backend::RemoteBackend;
use crate::cache::Cache;
use crate::errors::{BackendError, TransferError};
use crate::pointer;
use crate::repo::Repository;

/// Shared flag checked by the transfer loop between tasks; set by a
/// `tokio::signal` handler on SIGINT, mirroring the daemon's shutdown
/// wiring.
pub type ShutdownFlag = Arc<AtomicBool>;

pub fn new_shutdown_flag() -> ShutdownFlag {
    Arc::new(AtomicBool::new(false))
}

/// Install a Ctrl+C handler that sets `flag` when triggered.
pub fn watch_for_shutdown(flag: ShutdownFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received SIGINT, finishing in-flight transfers and stopping");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

/// Direction of a transfer batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Push,
    Pull,
    Clone,
}

/// Outcome of transferring a single hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Received,
    SkippedPresent,
    SkippedMissingAtSource,
    Failed(String),
}

/// One line of the final summary.
#[derive(Debug, Clone)]
pub struct HashResult {
    pub hash: String,
    pub outcome: Outcome,
}

/// Aggregate result of a transfer batch.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub results: Vec<HashResult>,
}

impl TransferSummary {
    pub fn all_succeeded(&self) -> bool {
        self.results
            .iter()
            .all(|r| !matches!(r.outcome, Outcome::Failed(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.outcome, Outcome::Failed(_))).count()
    }
}

const DEFAULT_CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

pub struct TransferEngine {
    concurrency: usize,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY }
    }
}

impl TransferEngine {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// Resolve the hash set for `direction` against a repository's
    /// working tree, per the rules in §4.6: push sends every hash
    /// referenced by a tracked sidecar that's present in the local
    /// cache; pull wants every referenced hash that's absent locally.
    pub fn resolve_hash_set(
        &self,
        repo: &Repository,
        cache: &Cache,
        direction: Direction,
    ) -> Result<BTreeSet<String>, TransferError> {
        let mut hashes = BTreeSet::new();
        for tracked in repo.walk_tracked_files() {
            if !pointer::is_sidecar(&tracked) {
                continue;
            }
            let abs = repo.root().join(&tracked);
            let Ok(record) = pointer::read(&abs) else { continue };
            let present = cache.has(&record.sha256);
            match direction {
                Direction::Push if present => {
                    hashes.insert(record.sha256);
                }
                Direction::Pull | Direction::Clone if !present => {
                    hashes.insert(record.sha256);
                }
                _ => {}
            }
        }
        Ok(hashes)
    }

    /// Run a transfer batch against `backend` for the given hash set.
    pub async fn run(
        &self,
        direction: Direction,
        backend: Arc<dyn RemoteBackend>,
        cache: Cache,
        hashes: BTreeSet<String>,
        shutdown: ShutdownFlag,
    ) -> TransferSummary {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for hash in hashes {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let semaphore = semaphore.clone();
            let backend = backend.clone();
            let cache = cache.clone();
            let shutdown = shutdown.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let outcome = transfer_one(direction, &backend, &cache, &hash, shutdown).await;
                HashResult { hash, outcome }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "transfer task panicked"),
            }
        }

        results.sort_by(|a, b| a.hash.cmp(&b.hash));
        TransferSummary { results }
    }
}

async fn transfer_one(
    direction: Direction,
    backend: &Arc<dyn RemoteBackend>,
    cache: &Cache,
    hash: &str,
    shutdown: ShutdownFlag,
) -> Outcome {
    if shutdown.load(Ordering::SeqCst) {
        return Outcome::Failed("cancelled".to_string());
    }

    let result = match direction {
        Direction::Push => push_one(backend, cache, hash).await,
        Direction::Pull | Direction::Clone => pull_one(backend, cache, hash).await,
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

async fn push_one(backend: &Arc<dyn RemoteBackend>, cache: &Cache, hash: &str) -> Result<Outcome, TransferError> {
    with_retry(hash, || async {
        let b = backend.clone();
        let c = cache.clone();
        let h = hash.to_string();
        tokio::task::spawn_blocking(move || -> Result<Outcome, BackendError> {
            if b.has(&h)? {
                return Ok(Outcome::SkippedPresent);
            }
            let Some(mut file) = c.open_blob(&h).map_err(|e| BackendError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))? else {
                return Ok(Outcome::SkippedMissingAtSource);
            };
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);
            b.put(&h, &mut file, size)?;
            Ok(Outcome::Sent)
        })
        .await
        .map_err(|e| BackendError::Transient(format!("join error: {e}")))?
    })
    .await
}

async fn pull_one(backend: &Arc<dyn RemoteBackend>, cache: &Cache, hash: &str) -> Result<Outcome, TransferError> {
    with_retry(hash, || async {
        let b = backend.clone();
        let c = cache.clone();
        let h = hash.to_string();
        tokio::task::spawn_blocking(move || -> Result<Outcome, BackendError> {
            if c.has(&h) {
                return Ok(Outcome::SkippedPresent);
            }
            let Some(mut reader) = b.get(&h)? else {
                return Ok(Outcome::SkippedMissingAtSource);
            };

            let mut tmp = c
                .create_temp()
                .map_err(|e| BackendError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            let mut hasher = Sha256::new();
            let mut buf = [0u8; 64 * 1024];
            loop {
                let n = reader.read(&mut buf).map_err(BackendError::Io)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                tmp.write_all(&buf[..n]).map_err(BackendError::Io)?;
            }
            tmp.flush().map_err(BackendError::Io)?;
            let computed = hex::encode(hasher.finalize());

            if computed != h {
                return Err(BackendError::Permanent(format!(
                    "corrupt transfer: expected {h}, computed {computed}"
                )));
            }
            c.promote(tmp, &h)
                .map_err(|e| BackendError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            Ok(Outcome::Received)
        })
        .await
        .map_err(|e| BackendError::Transient(format!("join error: {e}")))?
    })
    .await
}

async fn with_retry<F, Fut>(hash: &str, mut attempt: F) -> Result<Outcome, TransferError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Outcome, BackendError>>,
{
    let mut last_err = None;
    for try_num in 0..=MAX_RETRIES {
        match attempt().await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_retryable() && try_num < MAX_RETRIES => {
                let backoff = BASE_BACKOFF * 2u32.pow(try_num);
                debug!(hash, attempt = try_num, ?backoff, "retrying after transient error");
                tokio::time::sleep(backoff).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(last_err.expect("loop always sets last_err before exhausting retries").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use std::io::Cursor;

    fn hash_of(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(bytes))
    }

    #[tokio::test]
    async fn test_pull_transfers_missing_hash() {
        let remote_dir = tempfile::tempdir().unwrap();
        let remote = LocalBackend::new(remote_dir.path().to_str().unwrap());
        let hash = hash_of(b"payload");
        remote.put(&hash, &mut Cursor::new(b"payload"), 7).unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(cache_dir.path()).unwrap();

        let engine = TransferEngine::new(2);
        let mut hashes = BTreeSet::new();
        hashes.insert(hash.clone());

        let summary = engine
            .run(Direction::Pull, Arc::new(remote), cache.clone(), hashes, new_shutdown_flag())
            .await;

        assert!(summary.all_succeeded());
        assert_eq!(summary.results[0].outcome, Outcome::Received);
        assert!(cache.has(&hash));
    }

    #[tokio::test]
    async fn test_push_skips_present_at_destination() {
        let remote_dir = tempfile::tempdir().unwrap();
        let remote = LocalBackend::new(remote_dir.path().to_str().unwrap());
        let hash = hash_of(b"already-there");
        remote.put(&hash, &mut Cursor::new(b"already-there"), 13).unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(cache_dir.path()).unwrap();
        cache.store(Cursor::new(b"already-there" as &[u8])).unwrap();

        let engine = TransferEngine::new(2);
        let mut hashes = BTreeSet::new();
        hashes.insert(hash);

        let summary = engine
            .run(Direction::Push, Arc::new(remote), cache, hashes, new_shutdown_flag())
            .await;

        assert_eq!(summary.results[0].outcome, Outcome::SkippedPresent);
    }

    #[tokio::test]
    async fn test_pull_detects_corruption() {
        struct LyingBackend;
        impl RemoteBackend for LyingBackend {
            fn has(&self, _hash: &str) -> Result<bool, BackendError> {
                Ok(true)
            }
            fn get(&self, _hash: &str) -> Result<Option<crate::backend::BlobReader>, BackendError> {
                Ok(Some(Box::new(Cursor::new(b"wrong bytes".to_vec()))))
            }
            fn put(&self, _hash: &str, _reader: &mut dyn std::io::Read, _size: u64) -> Result<(), BackendError> {
                Ok(())
            }
            fn list(&self) -> Result<Vec<String>, BackendError> {
                Ok(Vec::new())
            }
        }

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(cache_dir.path()).unwrap();
        let engine = TransferEngine::new(1);
        let mut hashes = BTreeSet::new();
        let wrong_hash = "f".repeat(64);
        hashes.insert(wrong_hash.clone());

        let summary = engine
            .run(Direction::Pull, Arc::new(LyingBackend), cache, hashes, new_shutdown_flag())
            .await;

        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_summary_sorted_by_hash() {
        let remote_dir = tempfile::tempdir().unwrap();
        let remote = LocalBackend::new(remote_dir.path().to_str().unwrap());
        let h_a = hash_of(b"aaa");
        let h_b = hash_of(b"bbb");
        remote.put(&h_a, &mut Cursor::new(b"aaa"), 3).unwrap();
        remote.put(&h_b, &mut Cursor::new(b"bbb"), 3).unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(cache_dir.path()).unwrap();
        let engine = TransferEngine::new(4);
        let mut hashes = BTreeSet::new();
        hashes.insert(h_a.clone());
        hashes.insert(h_b.clone());

        let summary = engine
            .run(Direction::Pull, Arc::new(remote), cache, hashes, new_shutdown_flag())
            .await;

        let mut expected = vec![h_a, h_b];
        expected.sort();
        let actual: Vec<String> = summary.results.iter().map(|r| r.hash.clone()).collect();
        assert_eq!(actual, expected);
    }
}
