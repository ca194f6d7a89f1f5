//! Stub error types.
//!
//! Each variant maps to the IoTDB status code a real server reports for
//! the same failure, so clients see the same `{"code", "message"}` bodies.

use thiserror::Error;

/// Statement execution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StubError {
    /// Statement could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Statement parsed but is not allowed on this endpoint or path
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// Database already exists or overlaps an existing one
    #[error("{path} has already been created as database")]
    DatabaseAlreadyExists { path: String },

    /// Database does not exist
    #[error("Database {path} does not exist")]
    DatabaseNotExist { path: String },

    /// Time series already exists
    #[error("Path [{path}] already exist")]
    PathAlreadyExists { path: String },

    /// Time series or path does not exist
    #[error("Path [{path}] does not exist")]
    PathNotExist { path: String },

    /// Credentials missing or wrong
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
}

impl StubError {
    /// IoTDB status code for this error.
    pub fn code(&self) -> i64 {
        match self {
            StubError::Parse(_) => 700,
            StubError::Semantic(_) => 701,
            StubError::PathAlreadyExists { .. } => 501,
            StubError::PathNotExist { .. } => 508,
            StubError::DatabaseNotExist { .. } => 526,
            StubError::DatabaseAlreadyExists { .. } => 903,
            StubError::Unauthorized(_) => 801,
        }
    }
}

/// Result alias for stub operations.
pub type Result<T> = std::result::Result<T, StubError>;
