//! Error types shared by every stage of a merge.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while merging a set of clips.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The request itself is invalid (wrong input count, rejected URL, ...).
    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    /// Filesystem failure inside the workspace.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Fetching a remote input failed.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The encoder binary could not be spawned.
    #[error("FFmpeg not found at path: {path}")]
    EncoderNotFound { path: PathBuf },

    /// The encoder ran but reported failure.
    #[error("FFmpeg exited with code {exit_code:?}")]
    Processing {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    /// The encoder did not finish before the deadline and was killed.
    #[error("Merge timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The merge was cancelled (usually because the server is shutting down).
    #[error("Merge cancelled")]
    Cancelled,
}

/// Coarse classification of a [`MergeError`], used for events, metrics and
/// HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Io,
    Processing,
    Timeout,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Io => "io",
            Self::Processing => "processing",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl MergeError {
    /// Creates a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Wraps an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a fetch error.
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a processing error from the encoder's exit code and captured stderr.
    pub fn processing(exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::Processing { exit_code, stderr }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Io { .. } | Self::Fetch { .. } => ErrorKind::Io,
            Self::EncoderNotFound { .. } | Self::Processing { .. } => ErrorKind::Processing,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether the failure was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
