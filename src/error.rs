//! Error types and handling infrastructure for price-sync.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` context on top.
//!
//! ## Error Classes
//!
//! - **Invalid writes** (empty id, negative price) are *not* errors: the store reports
//!   them through [`PriceUpdate::Rejected`](crate::hub::store::PriceUpdate) and moves on.
//! - **Missing provider scope** is a wiring defect and surfaces as
//!   [`PriceSyncError::NoProviderInScope`].
//! - **Subscriber failures** are logged by the dispatcher and never reach the writer.

use thiserror::Error;

/// The main error type for price-sync operations.
#[derive(Error, Debug)]
pub enum PriceSyncError {
    /// The price hub was requested outside of an active provider scope
    #[error("no price provider in scope")]
    NoProviderInScope,

    /// The hub needs a current-thread tokio runtime so writers finish before subscribers run
    #[error("Unsupported runtime: {message}")]
    UnsupportedRuntime { message: String },

    /// A feed script line could not be parsed
    #[error("Invalid command on line {line}: {message}")]
    InvalidCommand { line: usize, message: String },

    /// Reading the feed source failed
    #[error("Feed read failed: {message}")]
    FeedError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for price-sync operations.
pub type Result<T> = std::result::Result<T, PriceSyncError>;

impl PriceSyncError {
    /// Create an InvalidCommand error for a 1-based script line
    pub fn invalid_command(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            line,
            message: message.into(),
        }
    }

    /// Create a FeedError from an io::Error with additional context
    pub fn feed(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FeedError {
            message: message.into(),
            source,
        }
    }

    /// Create an UnsupportedRuntime error with a descriptive message
    pub fn unsupported_runtime(message: impl Into<String>) -> Self {
        Self::UnsupportedRuntime {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PriceSyncError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::feed("Feed not found", err),
            std::io::ErrorKind::PermissionDenied => Self::feed("Permission denied", err),
            _ => Self::feed("IO operation failed", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            PriceSyncError::NoProviderInScope.to_string(),
            "no price provider in scope"
        );

        let invalid = PriceSyncError::invalid_command(3, "unknown verb 'sett'");
        assert_eq!(
            invalid.to_string(),
            "Invalid command on line 3: unknown verb 'sett'"
        );

        let config = PriceSyncError::config("epsilon must be finite");
        assert_eq!(
            config.to_string(),
            "Configuration error: epsilon must be finite"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PriceSyncError = io_err.into();

        match err {
            PriceSyncError::FeedError { message, .. } => {
                assert_eq!(message, "Feed not found");
            }
            other => panic!("Expected FeedError variant, got {other:?}"),
        }
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = PriceSyncError::feed(
            "read failed",
            std::io::Error::new(std::io::ErrorKind::Other, "disk"),
        );
        assert!(err.source().is_some());
    }
}
