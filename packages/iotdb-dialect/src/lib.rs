//! Relational-style dialect adapter for IoTDB.
//!
//! Provides connection URLs, scheme-to-driver routing, a REST transport,
//! an engine/session layer, and schema introspection that maps databases,
//! devices and time series onto schemas, tables and columns.

pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod inspector;
pub mod registry;
pub mod transport;
pub mod types;
pub mod url;

pub use config::EngineConfig;
pub use dialect::{IotdbDialect, SYSTEM_DATABASE, TIME_COLUMN};
pub use engine::{Engine, Session};
pub use error::{DialectError, Result};
pub use inspector::Inspector;
pub use registry::{DriverKind, Registry, DEFAULT_SCHEME};
pub use transport::{ResultSet, RestTransport, Transport};
pub use types::{ColumnInfo, SqlType};
pub use url::ConnectionUrl;
