//! SSH remote backend.
//!
//! Shells out to the system `ssh` client and transfers blobs with a
//! remote shell command, exactly as `lfs.rs` shells out to `git lfs
//! smudge`/`clean`: spawn, pipe stdin/stdout, check exit status. No SSH
//! protocol library is linked into this crate.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{BlobReader, RemoteBackend};
use crate::errors::BackendError;

/// `user@host:path` remote, reached via the system SSH client.
pub struct SshBackend {
    host_spec: String,
    remote_root: String,
}

impl SshBackend {
    pub fn new(url: &str) -> Result<Self, BackendError> {
        let (host_spec, remote_root) = url
            .split_once(':')
            .ok_or_else(|| BackendError::InvalidUrl(url.to_string()))?;
        Ok(Self {
            host_spec: host_spec.to_string(),
            remote_root: remote_root.to_string(),
        })
    }

    fn ssh_binary() -> String {
        std::env::var("LFC_SSH").unwrap_or_else(|_| "ssh".to_string())
    }

    fn remote_path(&self, hash: &str) -> String {
        let at = 2.min(hash.len());
        format!("{}/{}/{}", self.remote_root, &hash[..at], &hash[at..])
    }

    fn run_remote(&self, shell_command: &str) -> Result<std::process::Output, BackendError> {
        Command::new(Self::ssh_binary())
            .arg(&self.host_spec)
            .arg(shell_command)
            .output()
            .map_err(|e| BackendError::Transient(format!("failed to spawn ssh: {e}")))
    }
}

impl RemoteBackend for SshBackend {
    fn has(&self, hash: &str) -> Result<bool, BackendError> {
        let remote = self.remote_path(hash);
        let output = self.run_remote(&format!("test -e {remote}"))?;
        Ok(output.status.success())
    }

    fn get(&self, hash: &str) -> Result<Option<BlobReader>, BackendError> {
        let remote = self.remote_path(hash);
        let mut child = Command::new(Self::ssh_binary())
            .arg(&self.host_spec)
            .arg(format!("cat {remote}"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Transient(format!("failed to spawn ssh: {e}")))?;

        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut buf = Vec::new();
        stdout
            .read_to_end(&mut buf)
            .map_err(|e| BackendError::Transient(format!("ssh read failed: {e}")))?;
        let status = child
            .wait()
            .map_err(|e| BackendError::Transient(format!("ssh wait failed: {e}")))?;

        if !status.success() {
            debug!(hash, "remote has no blob (cat failed)");
            return Ok(None);
        }
        Ok(Some(Box::new(std::io::Cursor::new(buf))))
    }

    fn put(&self, hash: &str, reader: &mut dyn Read, _size: u64) -> Result<(), BackendError> {
        let remote = self.remote_path(hash);
        let remote_dir = remote.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(&self.remote_root);
        let remote_tmp = format!("{remote}.tmp.{}", std::process::id());

        self.run_remote(&format!("mkdir -p {remote_dir}"))?;

        let mut child = Command::new(Self::ssh_binary())
            .arg(&self.host_spec)
            .arg(format!("cat > {remote_tmp}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Transient(format!("failed to spawn ssh: {e}")))?;

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(BackendError::Io)?;
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(&buf)
            .map_err(|e| BackendError::Transient(format!("ssh write failed: {e}")))?;

        let status = child
            .wait()
            .map_err(|e| BackendError::Transient(format!("ssh wait failed: {e}")))?;
        if !status.success() {
            return Err(BackendError::Transient(format!("upload of {hash} failed")));
        }

        let move_status = self.run_remote(&format!("mv {remote_tmp} {remote}"))?;
        if !move_status.status.success() {
            return Err(BackendError::Permanent(format!("failed to finalize upload of {hash}")));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, BackendError> {
        let output = self.run_remote(&format!(
            "find {} -mindepth 2 -maxdepth 2 -type f",
            self.remote_root
        ))?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let mut hashes: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let rel = line.strip_prefix(&format!("{}/", self.remote_root))?;
                let (dir, file) = rel.split_once('/')?;
                if dir.len() == 2 {
                    Some(format!("{dir}{file}"))
                } else {
                    None
                }
            })
            .collect();
        hashes.sort();
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_parses_host_and_path() {
        let backend = SshBackend::new("user@host:remote/store").unwrap();
        assert_eq!(backend.host_spec, "user@host");
        assert_eq!(backend.remote_root, "remote/store");
    }

    #[test]
    fn test_new_rejects_url_without_colon() {
        assert!(SshBackend::new("no-colon-here").is_err());
    }

    #[test]
    fn test_remote_path_splits_hash() {
        let backend = SshBackend::new("user@host:store").unwrap();
        assert_eq!(backend.remote_path("abcd1234"), "store/ab/cd1234");
    }

    #[test]
    fn test_ssh_binary_honors_env_override() {
        std::env::set_var("LFC_SSH", "/usr/bin/custom-ssh");
        assert_eq!(SshBackend::ssh_binary(), "/usr/bin/custom-ssh");
        std::env::remove_var("LFC_SSH");
    }
}
