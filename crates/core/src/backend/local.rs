//! Local filesystem remote backend.
//!
//! Mirrors the local cache's own two-level hex layout and temp+rename
//! discipline, so a "remote" backed by a mounted directory or an NFS
//! share behaves identically to the cache itself.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BlobReader, RemoteBackend};
use crate::errors::BackendError;

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(url: &str) -> Self {
        Self { root: PathBuf::from(url) }
    }

    fn path_of(&self, hash: &str) -> PathBuf {
        let (dir, file) = split_hash(hash);
        self.root.join(dir).join(file)
    }
}

fn split_hash(hash: &str) -> (&str, &str) {
    let at = 2.min(hash.len());
    (&hash[..at], &hash[at..])
}

impl RemoteBackend for LocalBackend {
    fn has(&self, hash: &str) -> Result<bool, BackendError> {
        Ok(self.path_of(hash).is_file())
    }

    fn get(&self, hash: &str) -> Result<Option<BlobReader>, BackendError> {
        match fs::File::open(self.path_of(hash)) {
            Ok(f) => Ok(Some(Box::new(f))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, hash: &str, reader: &mut dyn Read, _size: u64) -> Result<(), BackendError> {
        let dest = self.path_of(hash);
        if dest.is_file() {
            debug!(hash, "remote already has blob, skipping upload");
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let dir = dest.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::Builder::new().prefix(".put-").tempfile_in(dir)?;
        std::io::copy(reader, &mut tmp)?;
        match tmp.persist(&dest) {
            Ok(_) => Ok(()),
            Err(e) => {
                if dest.is_file() {
                    Ok(())
                } else {
                    Err(e.error.into())
                }
            }
        }
    }

    fn list(&self) -> Result<Vec<String>, BackendError> {
        let mut hashes = Vec::new();
        if !self.root.is_dir() {
            return Ok(hashes);
        }
        for entry in walkdir::WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| BackendError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let prefix = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let rest = entry.file_name().to_str();
            if let (Some(prefix), Some(rest)) = (prefix, rest) {
                if prefix.len() == 2 && rest.len() == 62 {
                    hashes.push(format!("{prefix}{rest}"));
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}
