//! Date resolution for source and destination files.
//!
//! Embedded creation dates (EXIF and similar) come from a [`DateResolver`]
//! supplied by the caller. When it has nothing, the filesystem modification
//! time is used and the file is tagged as having no native timestamp.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Source of a file's embedded creation timestamp.
///
/// Any failure inside the resolver must be reported as `None`.
pub trait DateResolver {
    /// The embedded creation date of the file at `path`, if any.
    fn embedded_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

impl<F> DateResolver for F
where
    F: Fn(&Path) -> Option<NaiveDateTime>,
{
    fn embedded_date(&self, path: &Path) -> Option<NaiveDateTime> {
        self(path)
    }
}

/// Resolver that never finds an embedded date.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbeddedDates;

impl DateResolver for NoEmbeddedDates {
    fn embedded_date(&self, _path: &Path) -> Option<NaiveDateTime> {
        None
    }
}

/// Which files to place depending on whether they carry an embedded date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DatePolicy {
    /// Only files with an embedded date.
    #[serde(alias = "yes")]
    #[value(alias = "yes")]
    SkipMissing,
    /// Every file; the modification time stands in for a missing date.
    #[default]
    #[serde(alias = "no")]
    #[value(alias = "no")]
    Fallback,
    /// Only files without an embedded date.
    #[serde(alias = "fs")]
    #[value(alias = "fs")]
    OnlyMissing,
}

impl DatePolicy {
    /// Whether a file with (or without) an embedded date is placed.
    #[must_use]
    pub fn admits(self, source: DateSource) -> bool {
        match self {
            Self::SkipMissing => source == DateSource::Embedded,
            Self::Fallback => true,
            Self::OnlyMissing => source == DateSource::FileSystem,
        }
    }
}

impl std::fmt::Display for DatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SkipMissing => "skip-missing",
            Self::Fallback => "fallback",
            Self::OnlyMissing => "only-missing",
        })
    }
}

/// Where a resolved date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Embedded metadata.
    Embedded,
    /// Filesystem modification time (no native timestamp).
    FileSystem,
}

/// A file's date plus its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// The date used for placement and master selection.
    pub date: NaiveDateTime,
    /// Where it came from.
    pub source: DateSource,
}

impl ResolvedDate {
    /// Whether the file had no embedded date.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == DateSource::FileSystem
    }
}

/// Resolve a file's date: the embedded date, else `modified`.
#[must_use]
pub fn resolve_with_mtime(
    path: &Path,
    modified: SystemTime,
    resolver: &dyn DateResolver,
) -> ResolvedDate {
    match resolver.embedded_date(path) {
        Some(date) => ResolvedDate {
            date,
            source: DateSource::Embedded,
        },
        None => ResolvedDate {
            date: local_naive(modified),
            source: DateSource::FileSystem,
        },
    }
}

/// Modification time of the file at `path` as a local naive datetime.
///
/// # Errors
///
/// Returns the error from `stat` if the file cannot be inspected.
pub fn mtime_date(path: &Path) -> io::Result<NaiveDateTime> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(local_naive(modified))
}

/// Convert a [`SystemTime`] to local wall-clock time.
#[must_use]
pub fn local_naive(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Destination folder name for a date (`YYYY_MM_DD`).
#[must_use]
pub fn folder_name(date: NaiveDateTime) -> String {
    date.format("%Y_%m_%d").to_string()
}

/// Seconds since the epoch, treating the naive datetime as UTC.
///
/// Only used to order dates against each other.
#[must_use]
pub fn timestamp(date: NaiveDateTime) -> f64 {
    let utc = date.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}
