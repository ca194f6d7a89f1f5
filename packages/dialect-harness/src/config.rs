//! Harness configuration.
//!
//! Defaults match the `iotdb:dev` image. A TOML file may override any field,
//! and `IOTDB_IT_*` environment variables override the file.

use std::env;
use std::path::Path;
use std::time::Duration;

use iotdb_dialect::{ConnectionUrl, EngineConfig, DEFAULT_SCHEME};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Container and connection settings for the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Container image name (default: "iotdb")
    pub image: String,
    /// Container image tag (default: "dev")
    pub tag: String,
    /// Native protocol port inside the container (default: 6667)
    pub native_port: u16,
    /// REST service port inside the container (default: 18080)
    pub rest_port: u16,
    pub user: String,
    pub password: String,
    /// URL scheme resolved through the driver registry (default: "iotdb")
    pub scheme: String,
    /// Upper bound on container start plus REST readiness (default: 180)
    pub startup_timeout_secs: u64,
    /// Log line that marks the server as started
    pub ready_message: String,
    /// Engine settings for the scenario connection
    pub engine: EngineConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            image: "iotdb".to_string(),
            tag: "dev".to_string(),
            native_port: 6667,
            rest_port: 18080,
            user: "root".to_string(),
            password: "IoTDB@2011".to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            startup_timeout_secs: 180,
            ready_message: "Congratulations, IoTDB DataNode is set up successfully".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| HarnessError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| HarnessError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Applies `IOTDB_IT_*` overrides from the process environment, then
    /// the engine's own `IOTDB_*` overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())?;
        self.engine.apply_env_overrides()?;
        Ok(())
    }

    /// Applies overrides from any key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("IOTDB_IT_IMAGE") {
            self.image = val;
        }
        if let Some(val) = lookup("IOTDB_IT_TAG") {
            self.tag = val;
        }
        if let Some(val) = lookup("IOTDB_IT_USER") {
            self.user = val;
        }
        if let Some(val) = lookup("IOTDB_IT_PASSWORD") {
            self.password = val;
        }
        if let Some(val) = lookup("IOTDB_IT_SCHEME") {
            self.scheme = val;
        }
        if let Some(val) = lookup("IOTDB_IT_NATIVE_PORT") {
            self.native_port = val
                .parse()
                .map_err(|_| HarnessError::Config(format!("Invalid native_port: {}", val)))?;
        }
        if let Some(val) = lookup("IOTDB_IT_REST_PORT") {
            self.rest_port = val
                .parse()
                .map_err(|_| HarnessError::Config(format!("Invalid rest_port: {}", val)))?;
        }
        if let Some(val) = lookup("IOTDB_IT_STARTUP_TIMEOUT_SECS") {
            self.startup_timeout_secs = val.parse().map_err(|_| {
                HarnessError::Config(format!("Invalid startup_timeout_secs: {}", val))
            })?;
        }
        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Connection URL for a server reachable at `host:port`.
    pub fn connection_url(&self, host: &str, port: u16) -> ConnectionUrl {
        ConnectionUrl::new(&self.scheme, &self.user, &self.password, host, port)
    }
}
