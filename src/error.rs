//! Structured error handling and exit codes.

use serde::Serialize;

use crate::engine::{EngineError, RunReport};

/// Exit codes for the cleanbit binary.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Partial failure (at least one target failed)
/// - 3: Load error (some cleaner documents were rejected)
/// - 4: Invalid selection (unknown option id)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Partial failure: some targets could not be cleaned.
    PartialFailure = 2,
    /// Load error: some cleaner definitions were rejected.
    LoadError = 3,
    /// Invalid selection: an option id does not exist.
    InvalidSelection = 4,
    /// Interrupted: the run was cancelled by the user.
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
            Self::Success => "CB000",
            Self::GeneralError => "CB001",
            Self::PartialFailure => "CB002",
            Self::LoadError => "CB003",
            Self::InvalidSelection => "CB004",
            Self::Interrupted => "CB130",
        }
    }

    /// Exit code for a finished run.
    ///
    /// Cancellation outranks failures, which outrank load rejections.
    #[must_use]
    pub fn for_run(report: &RunReport, load_rejections: bool) -> Self {
        if report.cancelled {
            Self::Interrupted
        } else if report.has_failures() {
            Self::PartialFailure
        } else if load_rejections {
            Self::LoadError
        } else {
            Self::Success
        }
    }

    /// Exit code for an error that ended the program.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<EngineError>() {
            Some(EngineError::UnknownOption { .. } | EngineError::EmptySelection) => {
                Self::InvalidSelection
            }
            Some(EngineError::Cancelled) => Self::Interrupted,
            Some(EngineError::NoCleaners) => Self::LoadError,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CB001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
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
