//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the checksize binary.
///
/// - 0: Success (every candidate bucket was processed)
/// - 1: General error (unexpected failure)
/// - 2: No candidates (nothing shares a size, so nothing to resolve)
/// - 3: Partial success (discovery or digest errors occurred)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: resolution ran to completion.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No candidates: no two files share a size.
    NoCandidates = 2,
    /// Partial success: completed, but some files could not be read.
    PartialSuccess = 3,
    /// Interrupted: the run was cancelled with Ctrl+C.
    Interrupted = 130,
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
            Self::Success => "CS000",
            Self::GeneralError => "CS001",
            Self::NoCandidates => "CS002",
            Self::PartialSuccess => "CS003",
            Self::Interrupted => "CS130",
        }
    }

    /// Pick the exit code for a finished run.
    ///
    /// Cancellation wins over errors, and errors win over an empty result.
    #[must_use]
    pub fn for_run(cancelled: bool, error_count: usize, candidate_buckets: usize) -> Self {
        if cancelled {
            Self::Interrupted
        } else if error_count > 0 {
            Self::PartialSuccess
        } else if candidate_buckets == 0 {
            Self::NoCandidates
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
