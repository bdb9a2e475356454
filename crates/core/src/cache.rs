//! Content-addressed blob store under `.lfc/cache/`.
//!
//! `cache/<aa>/<bb...>` holds exactly the bytes whose SHA-256 hex digest
//! is `aabb...`. Blobs are immutable: once a rename lands a blob at its
//! final path, it is never mutated, only read or removed by `gc`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::CacheError;

/// Streaming chunk size used while hashing / copying. Chosen so that a
/// blob of arbitrary size is never buffered whole in memory.
const CHUNK_SIZE: usize = 64 * 1024;

/// Orphaned temp files older than this are swept at cache startup.
const ORPHAN_TEMP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// A content-addressed blob store rooted at a directory (typically
/// `<repo>/.lfc/cache`).
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Open (creating if necessary) a cache rooted at `root`, and sweep
    /// any orphaned temp files left behind by a crashed process.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("tmp"))?;
        let cache = Self { root };
        cache.sweep_orphan_temps()?;
        Ok(cache)
    }

    /// Root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic on-disk path for a given hash, `<aa>/<bb...>`.
    pub fn path_of(&self, hash: &str) -> PathBuf {
        let (dir, file) = split_hash(hash);
        self.root.join(dir).join(file)
    }

    /// Existence check by stat.
    pub fn has(&self, hash: &str) -> bool {
        self.path_of(hash).is_file()
    }

    /// Open a sequential reader for `hash`, or `Ok(None)` if absent.
    pub fn open_blob(&self, hash: &str) -> Result<Option<fs::File>, CacheError> {
        match fs::File::open(self.path_of(hash)) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`open_blob`](Self::open_blob), but re-hashes the full
    /// contents and returns [`CacheError::Corrupt`] if the bytes on disk
    /// don't match `hash`. Used for the optional verification mode
    /// mentioned in the cache's failure semantics.
    pub fn open_blob_verified(&self, hash: &str) -> Result<Option<fs::File>, CacheError> {
        let Some(mut file) = self.open_blob(hash)? else {
            return Ok(None);
        };
        let mut hasher = Sha256::new();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let computed = hex::encode(hasher.finalize());
        if computed != hash {
            return Err(CacheError::Corrupt {
                expected: hash.to_string(),
                computed,
            });
        }
        use std::io::Seek;
        file.seek(io::SeekFrom::Start(0))?;
        Ok(Some(file))
    }

    /// Stream bytes from `reader` through a SHA-256 accumulator into a
    /// temp file inside the cache, then atomically rename to the final
    /// two-level path. Returns the computed digest and byte count.
    ///
    /// If the final path already exists, the temp is discarded (blobs
    /// are immutable, so the existing content is assumed identical).
    pub fn store(&self, mut reader: impl Read) -> Result<(String, u64), CacheError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("store-")
            .tempfile_in(self.root.join("tmp"))?;

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n])?;
            total += n as u64;
        }
        tmp.flush()?;

        let hash = hex::encode(hasher.finalize());
        self.promote(tmp, &hash)?;
        Ok((hash, total))
    }

    /// Promote an already-hashed temp file to its final path under the
    /// given hash. Used by the transfer engine, which hashes incoming
    /// bytes itself so it can report a corruption error before
    /// promoting.
    pub fn promote(&self, tmp: tempfile::NamedTempFile, hash: &str) -> Result<(), CacheError> {
        let (dir, file) = split_hash(hash);
        let dest_dir = self.root.join(&dir);
        fs::create_dir_all(&dest_dir)?;
        let dest = dest_dir.join(&file);

        if dest.is_file() {
            debug!(hash, "blob already present, discarding duplicate temp");
            return Ok(());
        }

        match tmp.persist(&dest) {
            Ok(_) => {
                set_readonly(&dest)?;
                debug!(hash, path = %dest.display(), "stored blob");
                Ok(())
            }
            Err(e) => {
                // Someone else's concurrent `put` may have won the race
                // between our existence check and the rename.
                if dest.is_file() {
                    Ok(())
                } else {
                    Err(e.error.into())
                }
            }
        }
    }

    /// Open a fresh temp file inside this cache's temp directory, for
    /// callers (e.g. the transfer engine) that want to hash incoming
    /// bytes themselves before calling [`promote`](Self::promote).
    pub fn create_temp(&self) -> Result<tempfile::NamedTempFile, CacheError> {
        Ok(tempfile::Builder::new()
            .prefix("pull-")
            .tempfile_in(self.root.join("tmp"))?)
    }

    /// Remove temp files in `cache/tmp/` older than [`ORPHAN_TEMP_MAX_AGE`].
    fn sweep_orphan_temps(&self) -> Result<(), CacheError> {
        let tmp_dir = self.root.join("tmp");
        let now = SystemTime::now();
        let mut swept = 0u32;
        for entry in fs::read_dir(&tmp_dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let age = now
                .duration_since(meta.modified()?)
                .unwrap_or(Duration::ZERO);
            if age > ORPHAN_TEMP_MAX_AGE {
                if fs::remove_file(entry.path()).is_ok() {
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            info!(count = swept, "swept orphaned cache temp files");
        }
        Ok(())
    }

    /// Iterate over every hash currently present in the cache.
    pub fn list(&self) -> Result<Vec<String>, CacheError> {
        let mut hashes = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "error walking cache directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let parent_name = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let Some(prefix) = parent_name else { continue };
            if prefix == "tmp" {
                continue;
            }
            let Some(rest) = entry.file_name().to_str() else {
                continue;
            };
            if prefix.len() == 2 && rest.len() == 62 {
                hashes.push(format!("{prefix}{rest}"));
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

fn split_hash(hash: &str) -> (String, String) {
    let prefix = &hash[0..2.min(hash.len())];
    let rest = &hash[2.min(hash.len())..];
    (prefix.to_string(), rest.to_string())
}

/// Cache blobs are u+r only, to deter accidental mutation of immutable
/// content-addressed storage.
#[cfg(unix)]
fn set_readonly(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o400))
}

#[cfg(not(unix))]
fn set_readonly(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_store_and_has() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (hash, size) = cache.store(Cursor::new(b"hello world")).unwrap();
        assert_eq!(size, 11);
        assert!(cache.has(&hash));
    }

    #[test]
    fn test_blob_stored_at_expected_two_level_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (hash, _) = cache.store(Cursor::new(b"data")).unwrap();
        let expected = dir.path().join(&hash[0..2]).join(&hash[2..]);
        assert!(expected.is_file());
    }

    #[test]
    fn test_known_sha256_of_1mib_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let bytes = vec![0u8; 1024 * 1024];
        let (hash, size) = cache.store(Cursor::new(bytes)).unwrap();
        assert_eq!(size, 1048576);
        assert_eq!(
            hash,
            "30e14955ebf1352266dc2ff8067e68104607e750abb9d3b36582b8af909fcb58"
        );
    }

    #[test]
    fn test_storing_duplicate_content_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (hash1, _) = cache.store(Cursor::new(b"same")).unwrap();
        let (hash2, _) = cache.store(Cursor::new(b"same")).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[test]
    fn test_open_blob_verified_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (hash, _) = cache.store(Cursor::new(b"content")).unwrap();

        let blob_path = cache.path_of(&hash);
        let mut perms = fs::metadata(&blob_path).unwrap().permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            perms.set_mode(0o600);
        }
        #[cfg(not(unix))]
        perms.set_readonly(false);
        fs::set_permissions(&blob_path, perms).unwrap();
        fs::write(&blob_path, b"corrupted!").unwrap();

        let err = cache.open_blob_verified(&hash).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn test_stored_blob_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (hash, _) = cache.store(Cursor::new(b"immutable")).unwrap();
        let perms = fs::metadata(cache.path_of(&hash)).unwrap().permissions();
        assert!(perms.readonly());
    }

    #[test]
    fn test_missing_blob_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        assert!(!cache.has("0".repeat(64).as_str()));
        assert!(cache.open_blob(&"0".repeat(64)).unwrap().is_none());
    }

    #[test]
    fn test_list_returns_sorted_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let (h1, _) = cache.store(Cursor::new(b"a")).unwrap();
        let (h2, _) = cache.store(Cursor::new(b"b")).unwrap();
        let mut expected = vec![h1, h2];
        expected.sort();
        assert_eq!(cache.list().unwrap(), expected);
    }

    #[test]
    fn test_sweep_removes_old_orphan_temps_only() {
        let dir = tempfile::tempdir().unwrap();
        Cache::open(dir.path()).unwrap();
        let stale = dir.path().join("tmp").join("orphan-old");
        fs::write(&stale, b"x").unwrap();
        let old_time = SystemTime::now() - Duration::from_secs(60 * 60 * 48);
        if let Ok(file) = fs::OpenOptions::new().write(true).open(&stale) {
            let times = fs::FileTimes::new().set_modified(old_time);
            let _ = file.set_times(times);
        }

        // Re-opening triggers the sweep.
        Cache::open(dir.path()).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_sweep_keeps_fresh_temps() {
        let dir = tempfile::tempdir().unwrap();
        Cache::open(dir.path()).unwrap();
        let fresh = dir.path().join("tmp").join("in-progress");
        fs::write(&fresh, b"x").unwrap();
        Cache::open(dir.path()).unwrap();
        assert!(fresh.exists());
    }
}
