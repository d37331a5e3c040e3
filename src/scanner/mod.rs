//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Sorted, single-threaded directory walking using walkdir
//! - Streaming content hashing with BLAKE3
//! - Extension and name based filtering
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use orgphoto::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     extensions: Some(vec![".jpg".to_string()]),
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

// Re-export main types
pub use hasher::{hash_to_hex, hex_to_hash, Hash, Hasher, DEFAULT_BUFFER_SIZE};
pub use walker::Walker;

/// Metadata for a discovered file.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }

    /// Modification time as fractional seconds since the Unix epoch.
    #[must_use]
    pub fn mtime_secs(&self) -> f64 {
        system_time_to_secs(self.modified)
    }
}

/// Convert a [`SystemTime`] to fractional seconds since the Unix epoch.
///
/// Times before the epoch are returned as negative values.
#[must_use]
pub fn system_time_to_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Configuration for directory walking.
///
/// Controls filtering, symlink handling, and other walk behavior.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Lowercase extensions (with leading dot) to include.
    /// `None` means every file is yielded.
    pub extensions: Option<Vec<String>>,

    /// File name prefixes that are never yielded (e.g. the index store files).
    pub excluded_name_prefixes: Vec<String>,

    /// Directories whose whole subtree is skipped.
    pub excluded_dirs: Vec<PathBuf>,

    /// Individual files that are never yielded.
    pub excluded_files: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Restrict the walk to the given extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Option<Vec<String>>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Never yield files whose name starts with `prefix`.
    #[must_use]
    pub fn exclude_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_name_prefixes.push(prefix.into());
        self
    }

    /// Skip the subtree rooted at `dir`.
    #[must_use]
    pub fn exclude_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }

    /// Never yield the file at `path`.
    #[must_use]
    pub fn exclude_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded_files.push(path.into());
        self
    }
}

/// Normalize a comma-separated extension list into lowercase `.ext` entries.
///
/// Empty items are dropped; a leading dot is optional in the input.
///
/// ```
/// use orgphoto::scanner::normalize_extensions;
///
/// assert_eq!(normalize_extensions("JPG, .png,,heic"), vec![".jpg", ".png", ".heic"]);
/// ```
#[must_use]
pub fn normalize_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
        .collect()
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
