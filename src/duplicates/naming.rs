//! Collision-free file name generation.
//!
//! * [`unique_filename`]: `photo.jpg` -> `photo_001.jpg`, `photo_002.jpg`, ...
//! * [`duplicate_filename`]: `photo.jpg` -> `photo_duplicate.jpg`
//! * [`unique_duplicate_filename`]: `photo_duplicate.jpg`, then
//!   `photo_duplicate_001.jpg`, ...
//!
//! Counters stop after [`MAX_ATTEMPTS`].

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Highest counter tried before giving up.
pub const MAX_ATTEMPTS: u32 = 9999;

/// Errors from name generation.
#[derive(thiserror::Error, Debug)]
pub enum NamingError {
    /// Every counter up to [`MAX_ATTEMPTS`] is taken.
    #[error("Too many duplicates for {0}")]
    Exhausted(PathBuf),

    /// The path has no file name component.
    #[error("Path has no file name: {0}")]
    NoFileName(PathBuf),
}

fn compose(stem: &OsStr, middle: &str, extension: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(middle);
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

fn split(path: &Path) -> Result<(&OsStr, Option<&OsStr>), NamingError> {
    let stem = path
        .file_stem()
        .ok_or_else(|| NamingError::NoFileName(path.to_path_buf()))?;
    Ok((stem, path.extension()))
}

/// `path` itself if free, else the first free `stem_NNN.ext`.
///
/// # Errors
///
/// [`NamingError::Exhausted`] once every counter is taken.
pub fn unique_filename(path: &Path) -> Result<PathBuf, NamingError> {
    unique_filename_with(path, |p| p.exists())
}

pub(crate) fn unique_filename_with(
    path: &Path,
    is_taken: impl Fn(&Path) -> bool,
) -> Result<PathBuf, NamingError> {
    if !is_taken(path) {
        return Ok(path.to_path_buf());
    }
    let (stem, extension) = split(path)?;
    for n in 1..=MAX_ATTEMPTS {
        let candidate = path.with_file_name(compose(stem, &format!("_{n:03}"), extension));
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(NamingError::Exhausted(path.to_path_buf()))
}

/// Insert `_keyword` before the extension.
///
/// ```
/// use orgphoto::duplicates::duplicate_filename;
/// use std::path::Path;
///
/// assert_eq!(
///     duplicate_filename(Path::new("/a/vacation_2023.png"), "copy"),
///     Path::new("/a/vacation_2023_copy.png")
/// );
/// ```
#[must_use]
pub fn duplicate_filename(path: &Path, keyword: &str) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(compose(stem, &format!("_{keyword}"), path.extension())),
        None => path.to_path_buf(),
    }
}

/// First free name for a keyword-marked copy of `name` inside `dir`.
///
/// # Errors
///
/// [`NamingError::Exhausted`] once every counter is taken.
pub fn unique_duplicate_filename(
    dir: &Path,
    name: &OsStr,
    keyword: &str,
) -> Result<PathBuf, NamingError> {
    unique_duplicate_filename_with(dir, name, keyword, |p| p.exists())
}

pub(crate) fn unique_duplicate_filename_with(
    dir: &Path,
    name: &OsStr,
    keyword: &str,
    is_taken: impl Fn(&Path) -> bool,
) -> Result<PathBuf, NamingError> {
    let original = dir.join(name);
    let (stem, extension) = split(&original)?;

    let bare = dir.join(compose(stem, &format!("_{keyword}"), extension));
    if !is_taken(&bare) {
        return Ok(bare);
    }
    for n in 1..=MAX_ATTEMPTS {
        let candidate = dir.join(compose(stem, &format!("_{keyword}_{n:03}"), extension));
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(NamingError::Exhausted(original))
}
