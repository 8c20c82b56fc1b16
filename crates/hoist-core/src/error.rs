//! Error types and error code constants for hoist.
//!
//! `HoistError` is the single error type the library returns. Each step
//! (scan, extract, rewrite) reports its failures through it, and the CLI
//! renders it as a JSON error response.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad config, malformed listing, bad pattern)
//! - `3`: Resolution errors (file not found, range out of bounds, anchor missing)
//! - `4`: Apply errors (stale listing, conflicting edits)
//! - `10`: Internal errors (I/O failures, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

use crate::patch::Conflict;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad config, malformed listing).
    InvalidArguments = 2,
    /// Resolution errors (file, range or anchor could not be located).
    ResolutionError = 3,
    /// Apply errors (stale listing, overlapping edits).
    ApplyError = 4,
    /// Internal errors (I/O, bugs).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for every hoist operation.
#[derive(Debug, Error)]
pub enum HoistError {
    /// Invalid arguments or configuration.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A listing record could not be parsed.
    #[error("malformed listing at line {line}: {reason} ({content:?})")]
    MalformedListing {
        /// 1-indexed line within the listing.
        line: usize,
        content: String,
        reason: String,
    },

    /// The source changed since the listing was produced.
    #[error("listing is stale: source hash {actual} does not match recorded {expected}")]
    StaleListing { expected: String, actual: String },

    /// A descriptor points past the end of the source.
    #[error("handler {name} spans lines {start}-{end} but source has {line_count} lines")]
    RangeOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        line_count: usize,
    },

    /// An anchored edit could not be resolved (strict mode).
    #[error("anchor for {label} {reason}")]
    AnchorNotFound { label: String, reason: String },

    /// Edits in the patch set overlap.
    #[error("conflicting edits: {}", describe_conflicts(.conflicts, .positions))]
    PatchConflict {
        conflicts: Vec<Conflict>,
        /// 1-indexed `(line, col)` where each conflict begins.
        positions: Vec<(u32, u32)>,
    },

    /// A declaration or method pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// I/O failure on a known path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn describe_conflicts(conflicts: &[Conflict], positions: &[(u32, u32)]) -> String {
    conflicts
        .iter()
        .enumerate()
        .map(|(i, conflict)| match positions.get(i) {
            Some((line, col)) => format!("{} (line {}, col {})", conflict, line, col),
            None => conflict.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type HoistResult<T> = Result<T, HoistError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&HoistError> for OutputErrorCode {
    fn from(err: &HoistError) -> Self {
        match err {
            HoistError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            HoistError::MalformedListing { .. } => OutputErrorCode::InvalidArguments,
            HoistError::InvalidPattern { .. } => OutputErrorCode::InvalidArguments,
            HoistError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            HoistError::RangeOutOfBounds { .. } => OutputErrorCode::ResolutionError,
            HoistError::AnchorNotFound { .. } => OutputErrorCode::ResolutionError,
            HoistError::StaleListing { .. } => OutputErrorCode::ApplyError,
            HoistError::PatchConflict { .. } => OutputErrorCode::ApplyError,
            HoistError::Io { .. } => OutputErrorCode::InternalError,
            HoistError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<HoistError> for OutputErrorCode {
    fn from(err: HoistError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl HoistError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        HoistError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        HoistError::FileNotFound { path: path.into() }
    }

    /// Create a malformed listing error.
    pub fn malformed_listing(
        line: usize,
        content: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        HoistError::MalformedListing {
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, err: &regex::Error) -> Self {
        HoistError::InvalidPattern {
            pattern: pattern.into(),
            message: err.to_string(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        HoistError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
