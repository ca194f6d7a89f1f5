//! In-memory stand-in for the IoTDB REST service.
//!
//! Interprets the metadata statements a dialect issues (database and time
//! series DDL, `SHOW DATABASES`, `SHOW DEVICES`, `SHOW TIMESERIES`) against
//! a path tree and serves them over the REST v1 endpoints, so dialect and
//! scenario code can be exercised without a running database.

use std::net::SocketAddr;

pub mod error;
pub mod handlers;
pub mod router;
pub mod schema_tree;
pub mod server;
pub mod statement;

pub use error::{Result, StubError};
pub use schema_tree::{Outcome, SchemaTree, SeriesInfo, Table, SYSTEM_DATABASE};
pub use server::{StubHandle, StubServer};
pub use statement::Statement;

/// Stub server configuration.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Address to bind (port 0 for an ephemeral port)
    pub bind_addr: SocketAddr,
    /// Accepted user
    pub user: String,
    /// Accepted password
    pub password: String,
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            user: "root".to_string(),
            password: "IoTDB@2011".to_string(),
            request_timeout_ms: 5000,
        }
    }
}
