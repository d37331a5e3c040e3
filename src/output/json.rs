//! JSON output for organize summaries and index reports.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "source": "/media/card",
//!     "destination": "/home/me/Pictures",
//!     "mode": "copy",
//!     "dry_run": false,
//!     "duplicate_handling": "skip",
//!     "seen": 120,
//!     "processed": 118,
//!     "skipped": 2,
//!     "failed": 0,
//!     "demoted": 0,
//!     "demotion_failures": 0,
//!     "elapsed_ms": 812
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "OP000"
//! }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cache::{BuildStats, IndexStats, StoreLocation};
use crate::error::ExitCode;
use crate::organizer::RunSummary;

/// JSON document for one organize run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRunOutput<'a> {
    /// Run counters.
    pub summary: &'a RunSummary,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "OP000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonRunOutput<'a> {
    /// Wrap a summary.
    #[must_use]
    pub fn new(summary: &'a RunSummary) -> Self {
        let exit_code = summary.exit_code();
        Self {
            summary,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        write_json(writer, self)
    }
}

/// JSON document for the `index` subcommand.
#[derive(Debug, Clone, Serialize)]
pub struct JsonIndexReport {
    /// Indexed directory.
    pub target: PathBuf,
    /// Where the records live.
    pub store: StoreLocation,
    /// Counters of the build that just ran.
    pub build: BuildStats,
    /// Index contents afterwards.
    pub index: IndexStats,
    /// Build duration in milliseconds.
    pub build_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
}

impl JsonIndexReport {
    /// Assemble a report.
    #[must_use]
    pub fn new(target: &Path, store: StoreLocation, build: BuildStats, index: IndexStats) -> Self {
        Self {
            target: target.to_path_buf(),
            store,
            build_duration_ms: u64::try_from(build.elapsed.as_millis()).unwrap_or(u64::MAX),
            build,
            index,
            exit_code: ExitCode::Success.as_i32(),
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        write_json(writer, self)
    }
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), JsonOutputError> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
