//! Error types for the gateway.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Statement or parameter rejected by the safety policy.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database connection errors (pool not ready, host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution errors reported by the database itself
    /// (constraint violations, driver-rejected syntax, etc.)
    #[error("Query error: {message}")]
    Query {
        message: String,
        /// Driver-specific error code or SQLSTATE, when available.
        code: Option<String>,
    },

    /// Configuration errors (invalid connection string, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatekeeperError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message and no driver code.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            code: None,
        }
    }

    /// Creates a query error carrying the driver's error code.
    pub fn query_with_code(msg: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            code: Some(code.into()),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Connection(_) => "Connection Error",
            Self::Query { .. } => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the driver error code, if this is a query error that has one.
    pub fn driver_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias using GatekeeperError.
pub type Result<T> = std::result::Result<T, GatekeeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = GatekeeperError::validation("dangerous operation detected: drop table");
        assert_eq!(
            err.to_string(),
            "Validation error: dangerous operation detected: drop table"
        );
        assert_eq!(err.category(), "Validation Error");
    }

    #[test]
    fn test_error_display_connection() {
        let err = GatekeeperError::connection("Cannot connect to localhost:3306");
        assert_eq!(
            err.to_string(),
            "Connection error: Cannot connect to localhost:3306"
        );
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_query() {
        let err = GatekeeperError::query("Duplicate entry '1' for key 'PRIMARY'");
        assert_eq!(
            err.to_string(),
            "Query error: Duplicate entry '1' for key 'PRIMARY'"
        );
        assert_eq!(err.category(), "Query Error");
        assert!(err.driver_code().is_none());
    }

    #[test]
    fn test_query_error_carries_driver_code() {
        let err = GatekeeperError::query_with_code("Unknown column 'emal'", "1054");
        assert_eq!(err.driver_code(), Some("1054"));
        assert_eq!(err.to_string(), "Query error: Unknown column 'emal'");
    }

    #[test]
    fn test_error_display_config() {
        let err = GatekeeperError::config("DB_PORT is not a number");
        assert_eq!(
            err.to_string(),
            "Configuration error: DB_PORT is not a number"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatekeeperError>();
    }
}
