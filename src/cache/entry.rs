//! Cache record definitions.

use std::path::{Component, Path};

use crate::scanner::{hash_to_hex, Hash};

/// One indexed file under the target tree.
///
/// A record is valid only while the file's on-disk size and modification
/// time still equal the stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    /// Path relative to the target root, `/`-separated.
    pub relative_path: String,
    /// BLAKE3 digest of the full content.
    pub content_hash: Hash,
    /// File size in bytes when hashed.
    pub size: u64,
    /// Modification time (seconds since the epoch) when hashed.
    pub mtime: f64,
}

impl CacheRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(relative_path: impl Into<String>, content_hash: Hash, size: u64, mtime: f64) -> Self {
        Self {
            relative_path: relative_path.into(),
            content_hash,
            size,
            mtime,
        }
    }

    /// Whether the record still describes a file with this size and mtime.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, size: u64, mtime: f64) -> bool {
        self.size == size && self.mtime == mtime
    }

    /// Hex form of the content hash, as stored in the database.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.content_hash)
    }
}

/// Compute the `/`-separated key of `path` relative to `root`.
///
/// Returns `None` for paths outside `root`, for `root` itself, and for
/// paths containing non-UTF-8 components.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
