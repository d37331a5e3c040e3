//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing BLAKE3 digests
//! of file contents. Files are read in fixed-size chunks so memory use does
//! not depend on file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::HashError;

/// BLAKE3 digest of a file's full contents.
pub type Hash = [u8; 32];

/// Size of the read buffer used while hashing (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 64 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a hasher with a custom buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Configured buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Hash the entire content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Render a digest as lowercase hex (the form stored in the index).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Parse a lowercase/uppercase hex digest. Returns `None` for malformed input.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}
