//! Pointer-record codec.
//!
//! A pointer record (sidecar) is a small text file at `<path>.lfc` that
//! describes a tracked blob: its SHA-256 digest, byte size, and an
//! optional original filename. Lines are `key: value`, case-sensitive
//! keys, trimmed values. Blank lines and `#`-comments are ignored on
//! read; duplicate keys keep the last occurrence. Unknown keys are
//! preserved and re-emitted in sorted order so that re-writing an
//! unchanged record produces byte-identical output.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::PointerError;

/// Suffix appended to a tracked working-tree path to form its sidecar path.
pub const SIDECAR_SUFFIX: &str = ".lfc";

/// A parsed pointer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRecord {
    /// SHA-256 digest of the referenced blob, 64 lowercase hex chars.
    pub sha256: String,
    /// Byte length of the blob.
    pub size: u64,
    /// Original filename, for cross-platform aid. Optional.
    pub path: Option<String>,
    /// Unknown keys encountered while parsing, preserved for forward
    /// compatibility and re-emitted in sorted order.
    pub extra: BTreeMap<String, String>,
}

impl PointerRecord {
    /// Construct a minimal record from a digest and size.
    pub fn new(sha256: impl Into<String>, size: u64) -> Self {
        Self {
            sha256: sha256.into(),
            size,
            path: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an original path to the record (builder style).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Render the record into its canonical on-disk text form:
    /// `sha256`, then `size`, then `path` (if present), then sorted
    /// unknown keys, each `key: value`, terminated by a single newline.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        out.push_str("sha256: ");
        out.push_str(&self.sha256);
        out.push('\n');
        out.push_str("size: ");
        out.push_str(&self.size.to_string());
        out.push('\n');
        if let Some(ref path) = self.path {
            out.push_str("path: ");
            out.push_str(path);
            out.push('\n');
        }
        for (key, value) in &self.extra {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Parse a pointer record from its textual form.
    pub fn parse(text: &str, source: &str) -> Result<Self, PointerError> {
        let mut fields: BTreeMap<String, String> = BTreeMap::new();

        for line in text.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        let sha256 = fields.remove("sha256").ok_or_else(|| PointerError::MissingField {
            path: source.to_string(),
            field: "sha256".to_string(),
        })?;

        let size_str = fields.remove("size").ok_or_else(|| PointerError::MissingField {
            path: source.to_string(),
            field: "size".to_string(),
        })?;
        let size: u64 = size_str.parse().map_err(|e| PointerError::InvalidField {
            path: source.to_string(),
            field: "size".to_string(),
            detail: format!("{e}"),
        })?;

        let path = fields.remove("path");

        Ok(Self {
            sha256,
            size,
            path,
            extra: fields,
        })
    }
}

/// `true` if `path` has the sidecar suffix.
pub fn is_sidecar(path: &Path) -> bool {
    path.extension().map(|ext| ext == "lfc").unwrap_or(false)
}

/// Derive the sidecar path for a tracked working-tree file.
pub fn sidecar_path_for(original: &Path) -> PathBuf {
    let mut s = original.as_os_str().to_owned();
    s.push(SIDECAR_SUFFIX);
    PathBuf::from(s)
}

/// Strip the sidecar suffix, returning the original working-tree path.
pub fn original_of(sidecar: &Path) -> Option<PathBuf> {
    let s = sidecar.to_str()?;
    s.strip_suffix(SIDECAR_SUFFIX).map(PathBuf::from)
}

/// Read and parse a pointer record from disk.
pub fn read(sidecar_path: &Path) -> Result<PointerRecord, PointerError> {
    let text = fs::read_to_string(sidecar_path)?;
    PointerRecord::parse(&text, &sidecar_path.display().to_string())
}

/// Write a pointer record to disk in canonical form.
///
/// Idempotent: calling this twice with an unchanged record produces
/// byte-identical file contents.
pub fn write(sidecar_path: &Path, record: &PointerRecord) -> Result<(), PointerError> {
    let rendered = record.to_canonical_string();
    if let Ok(existing) = fs::read_to_string(sidecar_path) {
        if existing == rendered {
            debug!(path = %sidecar_path.display(), "sidecar already up to date");
            return Ok(());
        }
    }
    fs::write(sidecar_path, rendered)?;
    debug!(path = %sidecar_path.display(), "wrote sidecar");
    Ok(())
}
