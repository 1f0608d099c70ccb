//! Structured error handling and exit codes.

use serde::Serialize;

use crate::preload::PreloadState;

/// Exit codes for the asset-preload binary.
///
/// - 0: Success (every asset loaded)
/// - 1: General error (unexpected failure)
/// - 2: No assets (nothing discovered or requested)
/// - 3: Partial success (completed, but some assets failed to load)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: every asset loaded.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No assets: there was nothing to load.
    NoAssets = 2,
    /// Partial success: finished, but at least one asset failed.
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
            Self::Success => "AP000",
            Self::GeneralError => "AP001",
            Self::NoAssets => "AP002",
            Self::PartialSuccess => "AP003",
        }
    }

    /// Exit code for a finished preload run.
    #[must_use]
    pub fn for_state(state: &PreloadState) -> Self {
        if state.total == 0 {
            Self::NoAssets
        } else if state.failed > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "AP001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
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
