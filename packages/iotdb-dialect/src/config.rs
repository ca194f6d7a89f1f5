//! Engine configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};

/// Configuration for an engine and its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request timeout in milliseconds (default: 10000)
    pub request_timeout_ms: u64,
    /// TCP connect timeout in milliseconds (default: 3000)
    pub connect_timeout_ms: u64,
    /// Idle pooled connections kept per host (default: 4)
    pub pool_max_idle_per_host: usize,
    /// Path prefix of the REST API (default: "/rest/v1")
    pub api_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
            pool_max_idle_per_host: 4,
            api_prefix: "/rest/v1".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DialectError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| DialectError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Applies environment variable overrides.
    /// Variables are prefixed with `IOTDB_`, e.g. `IOTDB_REQUEST_TIMEOUT_MS=500`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("IOTDB_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = val.parse().map_err(|_| {
                DialectError::Config(format!("Invalid request_timeout_ms: {}", val))
            })?;
        }
        if let Ok(val) = env::var("IOTDB_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = val.parse().map_err(|_| {
                DialectError::Config(format!("Invalid connect_timeout_ms: {}", val))
            })?;
        }
        if let Ok(val) = env::var("IOTDB_POOL_MAX_IDLE_PER_HOST") {
            self.pool_max_idle_per_host = val.parse().map_err(|_| {
                DialectError::Config(format!("Invalid pool_max_idle_per_host: {}", val))
            })?;
        }
        if let Ok(val) = env::var("IOTDB_API_PREFIX") {
            self.api_prefix = val;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.api_prefix, "/rest/v1");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml("request_timeout_ms = 250").unwrap();
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.connect_timeout_ms, 3_000);
        assert_eq!(config.pool_max_idle_per_host, 4);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml("request_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, DialectError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "api_prefix = \"/rest/v2\"\npool_max_idle_per_host = 1\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.api_prefix, "/rest/v2");
        assert_eq!(config.pool_max_idle_per_host, 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, DialectError::Config(_)));
    }
}
