//! Copying and moving files into the destination tree.
//!
//! # Overview
//!
//! Every transfer refuses to replace an existing file. The resolver already
//! picked a free name, so an occupied destination at this point means the
//! tree changed underneath us and the safe reaction is to fail the file.
//!
//! * copy keeps the source and carries its access and modification times
//!   over to the copy
//! * move renames when possible and falls back to copy plus delete across
//!   filesystems
//!
//! # Example
//!
//! ```no_run
//! use orgphoto::actions::transfer::{transfer, TransferMode};
//! use std::path::Path;
//!
//! transfer(
//!     TransferMode::Copy,
//!     Path::new("/camera/IMG_0001.jpg"),
//!     Path::new("/photos/2024_05_01/IMG_0001.jpg"),
//! )
//! .unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How incoming files reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Leave the source in place.
    #[default]
    Copy,
    /// Remove the source afterwards.
    Move,
}

impl TransferMode {
    /// Present-tense verb for log lines.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }

    /// Past-tense verb for log lines.
    #[must_use]
    pub fn past(self) -> &'static str {
        match self {
            Self::Copy => "copied",
            Self::Move => "moved",
        }
    }
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

/// Error type for transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination is already taken.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// A destination directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy or rename itself failed.
    #[error("failed to {verb} {from} to {to}: {source}")]
    Io {
        verb: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// The path the error is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::DestinationExists(p) | Self::CreateDir { path: p, .. } => p,
            Self::Io { from, .. } => from,
        }
    }
}

/// Create `dir` and its parents. Returns whether anything was created.
///
/// # Errors
///
/// [`TransferError::CreateDir`] when creation fails.
pub fn ensure_dir(dir: &Path) -> Result<bool, TransferError> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|source| TransferError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Copy or move `from` to `to` according to `mode`.
///
/// # Errors
///
/// See [`copy_file`] and [`move_file`].
pub fn transfer(mode: TransferMode, from: &Path, to: &Path) -> Result<(), TransferError> {
    match mode {
        TransferMode::Copy => copy_file(from, to),
        TransferMode::Move => move_file(from, to),
    }
}

/// Copy a file, preserving its access and modification times.
///
/// # Errors
///
/// [`TransferError::DestinationExists`] if `to` exists, otherwise
/// [`TransferError::Io`] for copy failures. Failing to carry the timestamps
/// over is only logged.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), TransferError> {
    refuse_existing(to)?;
    fs::copy(from, to).map_err(|source| io_error("copy", from, to, source))?;

    match fs::metadata(from) {
        Ok(meta) => {
            let atime = FileTime::from_last_access_time(&meta);
            let mtime = FileTime::from_last_modification_time(&meta);
            if let Err(e) = filetime::set_file_times(to, atime, mtime) {
                log::warn!("Could not preserve timestamps on {}: {}", to.display(), e);
            }
        }
        Err(e) => log::warn!("Could not read timestamps of {}: {}", from.display(), e),
    }
    Ok(())
}

/// Move a file, falling back to copy and delete when renaming fails.
///
/// # Errors
///
/// [`TransferError::DestinationExists`] if `to` exists, otherwise
/// [`TransferError::Io`] when neither rename nor copy works.
pub fn move_file(from: &Path, to: &Path) -> Result<(), TransferError> {
    refuse_existing(to)?;
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::debug!(
                "Rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                rename_err
            );
            copy_file(from, to).map_err(|e| match e {
                TransferError::Io { source, .. } => io_error("move", from, to, source),
                other => other,
            })?;
            fs::remove_file(from).map_err(|source| io_error("move", from, to, source))
        }
    }
}

fn refuse_existing(to: &Path) -> Result<(), TransferError> {
    // symlink_metadata so a dangling link also counts as taken
    if fs::symlink_metadata(to).is_ok() {
        return Err(TransferError::DestinationExists(to.to_path_buf()));
    }
    Ok(())
}

fn io_error(verb: &'static str, from: &Path, to: &Path, source: io::Error) -> TransferError {
    TransferError::Io {
        verb,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}
