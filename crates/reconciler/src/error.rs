//! Error types for the reconciler crate.

use std::fmt;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug)]
pub enum Error {
    /// The shutter rejected or could not take the request.
    Shutter(smarthome_core::Error),
    /// Desired state could not be read.
    DesiredStateFailed { reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutter(err) => write!(f, "{err}"),
            Self::DesiredStateFailed { reason } => {
                write!(f, "reading desired state failed: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Shutter(err) => Some(err),
            _ => None,
        }
    }
}

impl From<smarthome_core::Error> for Error {
    fn from(err: smarthome_core::Error) -> Self {
        Self::Shutter(err)
    }
}

impl From<smarthome_core::ValidationError> for Error {
    fn from(err: smarthome_core::ValidationError) -> Self {
        Self::Shutter(err.into())
    }
}

impl Error {
    /// Create a desired state error.
    pub fn desired_state_failed(reason: impl Into<String>) -> Self {
        Self::DesiredStateFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the scheduler may try the same request again later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Shutter(err) => err.is_retryable(),
            Self::DesiredStateFailed { .. } => true,
            Self::InvalidConfig { .. } => false,
        }
    }
}
