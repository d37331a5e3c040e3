//! Structured error handling and exit codes.

use serde::Serialize;

use crate::config::ConfigError;
use crate::duplicates::ModeError;
use crate::organizer::OrganizeError;

/// Exit codes for the orgphoto application.
///
/// - 0: Success (every matched file was handled)
/// - 1: General error (unexpected failure, or the user declined to run)
/// - 2: Invalid input (bad paths, conflicting or unknown modes)
/// - 3: Partial success (completed, but some files failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without per-file failures.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Invalid input: paths or configuration were rejected before any work.
    InvalidInput = 2,
    /// Partial success: completed, but at least one file failed.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "OP000",
            Self::GeneralError => "OP001",
            Self::InvalidInput => "OP002",
            Self::PartialSuccess => "OP003",
        }
    }

    /// Exit code for an error that escaped to the binary boundary.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let invalid = err.chain().any(|cause| {
            cause.is::<ModeError>()
                || cause.is::<ConfigError>()
                || cause
                    .downcast_ref::<OrganizeError>()
                    .is_some_and(OrganizeError::is_input_error)
        });
        if invalid {
            Self::InvalidInput
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "OP002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
