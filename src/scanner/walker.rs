//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting regular files together with their size and
//! modification time. Traversal is single-threaded and sorted by file name,
//! so two walks over an unchanged tree yield files in the same order.
//!
//! # Features
//!
//! - Deterministic, sorted traversal
//! - Extension allow-list (case-insensitive)
//! - Excluded name prefixes (used to hide the index store from itself)
//! - Excluded subtrees (used when the destination lives inside the source)
//! - Optional hidden file filtering and symlink following
//!
//! # Example
//!
//! ```no_run
//! use orgphoto::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a directory entry should be descended into / yielded.
    fn keep_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if self.config.skip_hidden && is_hidden(entry) {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }

        if entry.file_type().is_dir()
            && self
                .config
                .excluded_dirs
                .iter()
                .any(|dir| entry.path().starts_with(dir))
        {
            log::debug!("Skipping excluded directory: {}", entry.path().display());
            return false;
        }

        true
    }

    /// Check if a file is excluded by exact path or name prefix.
    fn is_excluded_file(&self, path: &Path) -> bool {
        if self.config.excluded_files.iter().any(|f| f == path) {
            return true;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        self.config
            .excluded_name_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Check if a file passes the extension allow-list.
    pub fn passes_extension_filter(&self, path: &Path) -> bool {
        let Some(extensions) = &self.config.extensions else {
            return true;
        };

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| format!(".{}", s.to_lowercase()))
            .unwrap_or_default();

        extensions.iter().any(|ext| *ext == extension)
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Returns an iterator over [`FileEntry`] results. Errors are yielded
    /// as [`ScanError`] values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.keep_entry(entry))
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    let io_err = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
                    Some(Err(ScanError::from_io(&path, io_err)))
                }
            })
    }

    /// Turn a walkdir entry into a [`FileEntry`] if it is an eligible file.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }

        if file_type.is_symlink() && !self.config.follow_symlinks {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return None;
        }

        let path = entry.path();
        if self.is_excluded_file(path) {
            log::trace!("Skipping excluded file: {}", path.display());
            return None;
        }

        if !self.passes_extension_filter(path) {
            log::trace!("Skipping file due to extension filter: {}", path.display());
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let io_err = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("metadata unavailable"));
                return Some(Err(ScanError::from_io(path, io_err)));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(e) => return Some(Err(ScanError::from_io(path, e))),
        };

        Some(Ok(FileEntry::new(
            path.to_path_buf(),
            metadata.len(),
            modified,
        )))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(walker: &Walker) -> Vec<String> {
        walker
            .walk()
            .filter_map(Result::ok)
            .map(|f| {
                f.path
                    .strip_prefix(walker.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("b.JPG"), b"b").unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        fs::write(dir.path().join("sub/c.jpg"), b"c").unwrap();
        fs::write(dir.path().join("sub/deeper/d.txt"), b"d").unwrap();
        fs::write(dir.path().join(".orgphoto_cache.db"), b"db").unwrap();
        dir
    }

    #[test]
    fn test_walk_sorted_and_recursive() {
        let dir = setup();
        let walker = Walker::new(dir.path(), WalkerConfig::default());
        assert_eq!(
            names(&walker),
            vec![
                ".orgphoto_cache.db",
                "a.png",
                "b.JPG",
                "sub/c.jpg",
                "sub/deeper/d.txt"
            ]
        );
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        let dir = setup();
        let config = WalkerConfig::default().with_extensions(Some(vec![".jpg".to_string()]));
        let walker = Walker::new(dir.path(), config);
        assert_eq!(names(&walker), vec!["b.JPG", "sub/c.jpg"]);
    }

    #[test]
    fn test_excluded_prefix_and_dir() {
        let dir = setup();
        let config = WalkerConfig::default()
            .exclude_name_prefix(".orgphoto_cache.db")
            .exclude_dir(dir.path().join("sub/deeper"));
        let walker = Walker::new(dir.path(), config);
        assert_eq!(names(&walker), vec!["a.png", "b.JPG", "sub/c.jpg"]);
    }

    #[test]
    fn test_excluded_file() {
        let dir = setup();
        let config = WalkerConfig::default().exclude_file(dir.path().join("a.png"));
        let walker = Walker::new(dir.path(), config);
        assert!(!names(&walker).contains(&"a.png".to_string()));
        assert!(names(&walker).contains(&"b.JPG".to_string()));
    }

    #[test]
    fn test_skip_hidden() {
        let dir = setup();
        let config = WalkerConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let walker = Walker::new(dir.path(), config);
        assert!(!names(&walker).iter().any(|n| n.starts_with('.')));
    }

    #[test]
    fn test_missing_root_yields_error() {
        let dir = TempDir::new().unwrap();
        let walker = Walker::new(&dir.path().join("missing"), WalkerConfig::default());
        let results: Vec<_> = walker.walk().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_entry_carries_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.bin"), vec![0u8; 1234]).unwrap();
        let walker = Walker::new(dir.path(), WalkerConfig::default());
        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 1234);
    }
}
