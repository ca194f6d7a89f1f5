//! Engine and session layer.
//!
//! An [`Engine`] owns the pooled transport for one database URL. Sessions
//! borrow the engine and run statements strictly in order. Disposal drops
//! the transport (and with it the connection pool); it happens explicitly
//! through [`Engine::dispose`] or implicitly when the engine is dropped.

use std::sync::{Arc, RwLock};

use crate::config::EngineConfig;
use crate::dialect::IotdbDialect;
use crate::error::{DialectError, Result};
use crate::inspector::Inspector;
use crate::registry::Registry;
use crate::transport::{ResultSet, Transport};
use crate::url::ConnectionUrl;

/// Connection pool for one database.
pub struct Engine {
    dialect: IotdbDialect,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    target: String,
}

impl Engine {
    /// Resolves the URL scheme through `registry` and builds its transport.
    ///
    /// # Arguments
    ///
    /// * `registry` - Scheme to driver mapping
    /// * `url` - Target server and credentials
    /// * `config` - Timeouts and pool settings for the transport
    ///
    /// # Returns
    ///
    /// The engine, or `UnknownScheme` when no driver serves `url.scheme`.
    /// No request is sent until the first statement.
    pub fn connect(registry: &Registry, url: &ConnectionUrl, config: EngineConfig) -> Result<Self> {
        let driver = registry.resolve(&url.scheme)?;
        tracing::info!("Connecting to {} with driver {}", url.redacted(), driver);
        let transport = driver.connect(url, &config);
        Ok(Self {
            dialect: driver.dialect(),
            transport: RwLock::new(Some(transport)),
            target: url.redacted(),
        })
    }

    /// Parses `url` and connects.
    pub fn from_url(registry: &Registry, url: &str, config: EngineConfig) -> Result<Self> {
        let url = ConnectionUrl::parse(url)?;
        Self::connect(registry, &url, config)
    }

    /// Wraps an existing transport.
    pub fn with_transport(dialect: IotdbDialect, transport: Arc<dyn Transport>) -> Self {
        Self {
            dialect,
            transport: RwLock::new(Some(transport)),
            target: "custom transport".to_string(),
        }
    }

    pub fn dialect(&self) -> IotdbDialect {
        self.dialect
    }

    /// Opens a session.
    pub fn session(&self) -> Result<Session<'_>> {
        self.transport()?;
        Ok(Session {
            engine: self,
            executed: 0,
        })
    }

    /// Returns an introspection handle bound to this engine.
    pub fn inspector(&self) -> Inspector<'_> {
        Inspector::new(self)
    }

    pub async fn ping(&self) -> Result<()> {
        self.transport()?.ping().await
    }

    /// Releases the transport. Later calls fail with `Disposed`.
    pub fn dispose(&self) {
        let mut slot = self
            .transport
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            tracing::info!("Disposed engine for {}", self.target);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.transport
            .read()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }

    /// Current transport, or `Disposed`.
    pub(crate) fn transport(&self) -> Result<Arc<dyn Transport>> {
        let slot = self
            .transport
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_ref().cloned().ok_or(DialectError::Disposed)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("target", &self.target)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Ordered statement execution on an engine.
///
/// IoTDB statements auto-commit, so a session only scopes ordering and
/// bookkeeping; there is nothing to roll back.
pub struct Session<'a> {
    engine: &'a Engine,
    executed: usize,
}

impl Session<'_> {
    /// Executes a statement that returns no rows.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        let transport = self.engine.transport()?;
        transport.execute(sql).await.map_err(|e| {
            tracing::warn!("Statement failed: {}: {}", sql, e);
            e
        })?;
        self.executed += 1;
        Ok(())
    }

    /// Executes a statement and returns its rows.
    pub async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let transport = self.engine.transport()?;
        let rows = transport.query(sql).await?;
        self.executed += 1;
        Ok(rows)
    }

    /// Number of statements that completed successfully.
    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn close(self) {
        tracing::debug!("Session closed after {} statements", self.executed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records statements and fails those containing "bad".
    #[derive(Default)]
    struct RecordingTransport {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn execute(&self, sql: &str) -> Result<()> {
            self.seen.lock().unwrap().push(sql.to_string());
            if sql.contains("bad") {
                return Err(DialectError::Server {
                    code: 700,
                    message: "syntax".to_string(),
                    sql: sql.to_string(),
                });
            }
            Ok(())
        }

        async fn query(&self, sql: &str) -> Result<ResultSet> {
            self.seen.lock().unwrap().push(sql.to_string());
            Ok(ResultSet::default())
        }
    }

    #[tokio::test]
    async fn test_session_runs_in_order() {
        let transport = Arc::new(RecordingTransport::default());
        let engine = Engine::with_transport(IotdbDialect, transport.clone());

        let mut session = engine.session().unwrap();
        session.execute("create database root.a").await.unwrap();
        session.query("show databases").await.unwrap();
        assert!(session.execute("bad statement").await.is_err());
        assert_eq!(session.executed(), 2);
        session.close();

        assert_eq!(
            *transport.seen.lock().unwrap(),
            vec!["create database root.a", "show databases", "bad statement"]
        );
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_blocks_calls() {
        let transport = Arc::new(RecordingTransport::default());
        let engine = Engine::with_transport(IotdbDialect, transport.clone());
        assert!(!engine.is_disposed());
        engine.ping().await.unwrap();

        engine.dispose();
        engine.dispose();
        assert!(engine.is_disposed());
        assert!(matches!(engine.session(), Err(DialectError::Disposed)));
        assert_eq!(engine.ping().await, Err(DialectError::Disposed));
    }

    #[test]
    fn test_drop_releases_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let engine = Engine::with_transport(IotdbDialect, transport.clone());
        assert_eq!(Arc::strong_count(&transport), 2);
        drop(engine);
        assert_eq!(Arc::strong_count(&transport), 1);
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let registry = Registry::with_defaults();
        let err = Engine::from_url(&registry, "mysql://u:p@h:1", EngineConfig::default())
            .unwrap_err();
        assert_eq!(err, DialectError::UnknownScheme("mysql".to_string()));
    }
}
