//! Result type definition and extension traits.
//!
//! The persistence boundary is allowed to fail without taking the process
//! down; these combinators log the failure and carry on.

use crate::error::Error;

/// The standard Result type for smart home operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing logged fallbacks for Results.
pub trait ResultExt<T> {
    /// Get the value or a default, logging the error if present.
    fn or_default_logged(self, default: T, context: &str) -> T;

    /// Discard the value, logging the error if present.
    fn log_failure(self, context: &str);
}

impl<T> ResultExt<T> for Result<T> {
    fn or_default_logged(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "{context}, using defaults");
                default
            }
        }
    }

    fn log_failure(self, context: &str) {
        if let Err(e) = self {
            tracing::error!(error = %e, "{context}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_default_logged_ok() {
        let result: Result<i32> = Ok(42);
        assert_eq!(result.or_default_logged(0, "loading"), 42);
    }

    #[test]
    fn test_or_default_logged_err() {
        let result: Result<i32> = Err(Error::json_parse_failed("eof"));
        assert_eq!(result.or_default_logged(99, "loading"), 99);
    }

    #[test]
    fn test_log_failure_swallows_error() {
        let result: Result<()> = Err(Error::file_write_failed("/tmp/x", "denied"));
        result.log_failure("saving");
    }
}
