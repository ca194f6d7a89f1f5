//! Harness error types.

use iotdb_dialect::DialectError;
use thiserror::Error;

/// Errors that stop the scenario before any check can run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Container could not be started or never became ready
    #[error("Provisioning failed: {0}")]
    Provision(String),

    /// Engine construction or connection failure
    #[error(transparent)]
    Dialect(#[from] DialectError),

    /// Configuration file or environment override is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<testcontainers::TestcontainersError> for HarnessError {
    fn from(err: testcontainers::TestcontainersError) -> Self {
        HarnessError::Provision(err.to_string())
    }
}

/// Result alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
