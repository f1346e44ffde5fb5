//! Core error types for smart home operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// A requested percentage fell outside `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cannot close more than 100% (requested {value}%)")]
    AboveMaximum { value: i64 },

    #[error("cannot open more than 0% closed (requested {value}%)")]
    BelowMinimum { value: i64 },
}

/// Core error type for smart home operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("command queue of shutter '{name}' is closed")]
    QueueClosed { name: String },

    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to write file '{path}': {reason}")]
    FileWriteFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a queue closed error.
    pub fn queue_closed(name: impl Into<String>) -> Self {
        Self::QueueClosed { name: name.into() }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a file write error.
    pub fn file_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether repeating the same request may succeed later.
    ///
    /// Validation and configuration errors are terminal: the same input
    /// fails the same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::InvalidConfig { .. })
    }
}
