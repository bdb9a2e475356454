//! End-to-end scenarios exercising `lfc-core` the way `lfc-cli` composes
//! it: init, add, push/pull against a local remote, clone, and the
//! failure paths a careful reviewer would want covered before trusting
//! the transfer engine with someone's data.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use lfc_core::backend::{self, LocalBackend, RemoteBackend};
use lfc_core::config::TrackingMode;
use lfc_core::pointer;
use lfc_core::reconciler::{ReconcileStatus, Reconciler};
use lfc_core::repo::Repository;
use lfc_core::transfer::{new_shutdown_flag, Direction, Outcome, TransferEngine};

fn init_git(dir: &Path) {
    Command::new("git").arg("init").arg("-q").current_dir(dir).status().unwrap();
    Command::new("git").args(["config", "user.email", "t@t.com"]).current_dir(dir).status().unwrap();
    Command::new("git").args(["config", "user.name", "T"]).current_dir(dir).status().unwrap();
}

fn sidecars(repo: &Repository) -> Vec<std::path::PathBuf> {
    repo.walk_tracked_files().into_iter().filter(|p| pointer::is_sidecar(p)).collect()
}

/// S1: `init` in an empty directory produces the expected layout.
#[test]
fn s1_init_creates_expected_layout() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    assert!(dir.path().join(".lfc").is_dir());
    assert!(repo.config_path().exists());
    let ignore = std::fs::read_to_string(dir.path().join(".lfc/.gitignore")).unwrap();
    assert!(ignore.contains("cache/"));
}

/// S2: adding a known 1 MiB file produces the documented hash and size,
/// and registers the original in `.gitignore`.
#[test]
fn s2_add_known_file_matches_expected_digest() {
    let dir = tempfile::tempdir().unwrap();
    init_git(dir.path());
    let repo = Repository::init(dir.path()).unwrap();
    let cache = repo.cache().unwrap();

    let payload = vec![0u8; 1024 * 1024];
    std::fs::write(dir.path().join("myfile.dat"), &payload).unwrap();

    let reconciler = Reconciler::new(repo.root(), &cache, repo.config().unwrap().hash_check);
    let record = reconciler.add(Path::new("myfile.dat"), TrackingMode::Link).unwrap();

    assert_eq!(record.size, 1_048_576);
    assert_eq!(record.sha256, "30e14955ebf1352266dc2ff8067e68104607e750abb9d3b36582b8af909fcb58");

    let ignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap_or_default();
    assert!(ignore.contains("myfile.dat"));
    assert!(cache.has(&record.sha256));
}

/// S3: pushing to a local remote lands the blob at its hash path, and a
/// repeat push reports `skipped-present`.
#[tokio::test]
async fn s3_push_then_repeat_push_skips_present() {
    let dir = tempfile::tempdir().unwrap();
    init_git(dir.path());
    let hub = tempfile::tempdir().unwrap();

    let repo = Repository::init(dir.path()).unwrap();
    let cache = repo.cache().unwrap();
    repo.remote_add("origin", hub.path().to_str().unwrap(), true).unwrap();

    let payload = vec![0u8; 1024 * 1024];
    std::fs::write(dir.path().join("myfile.dat"), &payload).unwrap();
    let reconciler = Reconciler::new(repo.root(), &cache, repo.config().unwrap().hash_check);
    let record = reconciler.add(Path::new("myfile.dat"), TrackingMode::Link).unwrap();

    let engine = TransferEngine::new(2);
    let remote: Arc<dyn RemoteBackend> = Arc::from(backend::open(hub.path().to_str().unwrap()).unwrap());

    let hashes = engine.resolve_hash_set(&repo, &cache, Direction::Push).unwrap();
    assert!(hashes.contains(&record.sha256));
    let summary = engine.run(Direction::Push, remote.clone(), cache.clone(), hashes, new_shutdown_flag()).await;
    assert!(summary.all_succeeded());
    assert_eq!(summary.results[0].outcome, Outcome::Sent);

    let landed = hub.path().join(&record.sha256[0..2]).join(&record.sha256[2..]);
    assert_eq!(std::fs::read(&landed).unwrap(), payload);

    let hashes_again = engine.resolve_hash_set(&repo, &cache, Direction::Push).unwrap();
    let summary2 = engine.run(Direction::Push, remote, cache, hashes_again, new_shutdown_flag()).await;
    assert_eq!(summary2.results[0].outcome, Outcome::SkippedPresent);
}

/// S4: a fresh clone (sidecar present, cache empty) materializes the
/// original on `pull`, and `status` then reports `materialized`.
#[tokio::test]
async fn s4_pull_materializes_and_status_reports_materialized() {
    let source_dir = tempfile::tempdir().unwrap();
    init_git(source_dir.path());
    let hub = tempfile::tempdir().unwrap();

    let source_repo = Repository::init(source_dir.path()).unwrap();
    let source_cache = source_repo.cache().unwrap();
    source_repo.remote_add("origin", hub.path().to_str().unwrap(), true).unwrap();

    let payload = b"clone me".repeat(1000);
    std::fs::write(source_dir.path().join("myfile.dat"), &payload).unwrap();
    let reconciler = Reconciler::new(source_repo.root(), &source_cache, source_repo.config().unwrap().hash_check);
    let record = reconciler.add(Path::new("myfile.dat"), TrackingMode::Link).unwrap();

    let engine = TransferEngine::new(2);
    let remote: Arc<dyn RemoteBackend> = Arc::from(backend::open(hub.path().to_str().unwrap()).unwrap());
    let push_hashes = engine.resolve_hash_set(&source_repo, &source_cache, Direction::Push).unwrap();
    engine.run(Direction::Push, remote.clone(), source_cache.clone(), push_hashes, new_shutdown_flag()).await;

    // Simulate a fresh clone: same sidecar, empty cache, no materialized file.
    let clone_dir = tempfile::tempdir().unwrap();
    init_git(clone_dir.path());
    let clone_repo = Repository::init(clone_dir.path()).unwrap();
    let clone_cache = clone_repo.cache().unwrap();
    clone_repo.remote_add("origin", hub.path().to_str().unwrap(), true).unwrap();

    let sidecar_rel = pointer::sidecar_path_for(Path::new("myfile.dat"));
    std::fs::copy(
        pointer::sidecar_path_for(&source_dir.path().join("myfile.dat")),
        clone_dir.path().join(&sidecar_rel),
    )
    .unwrap();

    let pull_hashes = engine.resolve_hash_set(&clone_repo, &clone_cache, Direction::Pull).unwrap();
    assert!(pull_hashes.contains(&record.sha256));
    let summary = engine.run(Direction::Pull, remote, clone_cache.clone(), pull_hashes, new_shutdown_flag()).await;
    assert!(summary.all_succeeded());

    let clone_reconciler = Reconciler::new(clone_repo.root(), &clone_cache, clone_repo.config().unwrap().hash_check);
    clone_reconciler.checkout(Path::new("myfile.dat")).unwrap();
    assert_eq!(std::fs::read(clone_dir.path().join("myfile.dat")).unwrap(), payload);

    let status = clone_reconciler.status(&sidecars(&clone_repo));
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].status, ReconcileStatus::Materialized);
}

/// S5: a corrupted remote blob is detected on pull and never promoted
/// into the cache or materialized into the working tree.
#[tokio::test]
async fn s5_corrupt_remote_blob_fails_pull_without_materializing() {
    let hub = tempfile::tempdir().unwrap();
    let remote = LocalBackend::new(hub.path().to_str().unwrap());

    let good = b"the real bytes";
    let hash = {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(good))
    };
    remote.put(&hash, &mut std::io::Cursor::new(good.to_vec()), good.len() as u64).unwrap();

    // Flip a byte directly on disk, simulating bit rot at the remote.
    let blob_path = hub.path().join(&hash[0..2]).join(&hash[2..]);
    let mut bytes = std::fs::read(&blob_path).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&blob_path, &bytes).unwrap();

    let clone_dir = tempfile::tempdir().unwrap();
    init_git(clone_dir.path());
    let clone_repo = Repository::init(clone_dir.path()).unwrap();
    let clone_cache = clone_repo.cache().unwrap();

    let mut hashes = std::collections::BTreeSet::new();
    hashes.insert(hash.clone());

    let engine = TransferEngine::new(1);
    let summary = engine
        .run(Direction::Pull, Arc::new(remote), clone_cache.clone(), hashes, new_shutdown_flag())
        .await;

    assert!(!summary.all_succeeded());
    match &summary.results[0].outcome {
        Outcome::Failed(reason) => assert!(reason.contains("corrupt"), "unexpected failure reason: {reason}"),
        other => panic!("expected a failed outcome, got {other:?}"),
    }
    assert!(!clone_cache.has(&hash), "corrupt blob must never be promoted into the cache");
}

/// S6: concurrent `add` of many small files produces exactly one blob
/// per distinct hash, each sidecar consistent with its source bytes,
/// and no temp files left behind in the cache.
#[tokio::test]
async fn s6_concurrent_add_leaves_no_orphan_temps() {
    let dir = tempfile::tempdir().unwrap();
    init_git(dir.path());
    let repo = Arc::new(Repository::init(dir.path()).unwrap());
    let cache = Arc::new(repo.cache().unwrap());
    let hash_check = repo.config().unwrap().hash_check;

    let mut handles = Vec::new();
    for i in 0..100u32 {
        let repo = repo.clone();
        let cache = cache.clone();
        let filename = format!("file-{i:03}.bin");
        let bytes: Vec<u8> = (0..64u8).map(|b| b.wrapping_add(i as u8)).collect();
        std::fs::write(dir.path().join(&filename), &bytes).unwrap();

        handles.push(tokio::task::spawn_blocking(move || {
            let reconciler = Reconciler::new(repo.root(), &cache, hash_check);
            let record = reconciler.add(Path::new(&filename), TrackingMode::Link).unwrap();
            (filename, record, bytes)
        }));
    }

    let mut seen_hashes = std::collections::BTreeSet::new();
    for handle in handles {
        let (filename, record, bytes) = handle.await.unwrap();
        let expected = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(&bytes))
        };
        assert_eq!(record.sha256, expected, "sidecar hash mismatch for {filename}");
        seen_hashes.insert(record.sha256);
    }

    assert_eq!(seen_hashes.len(), 100, "expected 100 distinct blobs, one per file");
    assert_eq!(cache.list().unwrap().len(), 100);

    let tmp_dir = repo.cache_dir().join("tmp");
    let leftover: Vec<_> = std::fs::read_dir(&tmp_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.metadata().map(|m| m.is_file()).unwrap_or(false))
        .collect();
    assert!(leftover.is_empty(), "orphan temp files left behind: {leftover:?}");
}

/// Rounds out the scenario suite: `status` distinguishes `cached-only`
/// from `missing` when the working-tree file has been removed but the
/// blob is or isn't still in the local cache.
#[test]
fn status_distinguishes_cached_only_from_missing() {
    let dir = tempfile::tempdir().unwrap();
    init_git(dir.path());
    let repo = Repository::init(dir.path()).unwrap();
    let cache = repo.cache().unwrap();
    let reconciler = Reconciler::new(repo.root(), &cache, repo.config().unwrap().hash_check);

    std::fs::write(dir.path().join("kept.bin"), b"kept bytes").unwrap();
    std::fs::write(dir.path().join("gone.bin"), b"gone bytes").unwrap();
    let kept = reconciler.add(Path::new("kept.bin"), TrackingMode::Link).unwrap();
    let gone = reconciler.add(Path::new("gone.bin"), TrackingMode::Link).unwrap();

    std::fs::remove_file(dir.path().join("kept.bin")).unwrap();
    std::fs::remove_file(dir.path().join("gone.bin")).unwrap();
    std::fs::remove_file(cache.path_of(&gone.sha256)).unwrap();

    let entries = reconciler.status(&sidecars(&repo));
    let by_path: std::collections::HashMap<_, _> = entries.iter().map(|e| (e.path.clone(), &e.status)).collect();
    assert_eq!(by_path[Path::new("kept.bin")], &ReconcileStatus::CachedOnly);
    assert_eq!(by_path[Path::new("gone.bin")], &ReconcileStatus::Missing);
    let _ = kept;
}
