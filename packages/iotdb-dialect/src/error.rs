//! Dialect error types.

use thiserror::Error;

/// Errors raised by the dialect, engine and transport layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialectError {
    /// Connection URL could not be parsed
    #[error("Invalid connection URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No driver registered for the URL scheme
    #[error("No driver registered for scheme '{0}'")]
    UnknownScheme(String),

    /// Scheme already routed to a different driver
    #[error("Scheme '{scheme}' is already registered to {existing}, cannot register {requested}")]
    SchemeConflict {
        scheme: String,
        existing: String,
        requested: String,
    },

    /// Schema or table name unusable inside a path pattern
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Network or HTTP level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request did not complete in time
    #[error("Request timeout after {0} ms")]
    Timeout(u64),

    /// Server rejected the statement
    #[error("Server error {code} for '{sql}': {message}")]
    Server {
        code: i64,
        message: String,
        sql: String,
    },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration file or environment override is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine was disposed before the call
    #[error("Engine has been disposed")]
    Disposed,
}

/// Result alias for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
