//! URL scheme to driver routing.
//!
//! Every driver the crate can construct is a [`DriverKind`] variant, so the
//! set of reachable drivers is fixed at compile time. The [`Registry`] only
//! decides which schemes route to which variant.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::config::EngineConfig;
use crate::dialect::IotdbDialect;
use crate::error::{DialectError, Result};
use crate::transport::{RestTransport, Transport};
use crate::url::ConnectionUrl;

/// Scheme registered by [`Registry::with_defaults`].
pub const DEFAULT_SCHEME: &str = "iotdb";

/// Drivers known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// IoTDB over the REST v1 API
    IotdbRest,
}

impl DriverKind {
    pub fn dialect(&self) -> IotdbDialect {
        match self {
            DriverKind::IotdbRest => IotdbDialect,
        }
    }

    /// Builds the transport for this driver.
    pub fn connect(&self, url: &ConnectionUrl, config: &EngineConfig) -> Arc<dyn Transport> {
        match self {
            DriverKind::IotdbRest => Arc::new(RestTransport::new(url, config)),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::IotdbRest => write!(f, "iotdb-rest"),
        }
    }
}

/// Scheme to driver mapping.
///
/// Thread-safe; registration of an identical pair is a no-op so callers
/// can register unconditionally.
#[derive(Debug, Default)]
pub struct Registry {
    drivers: RwLock<BTreeMap<String, DriverKind>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry routing [`DEFAULT_SCHEME`] to the REST driver.
    pub fn with_defaults() -> Self {
        let mut drivers = BTreeMap::new();
        drivers.insert(DEFAULT_SCHEME.to_string(), DriverKind::IotdbRest);
        Self {
            drivers: RwLock::new(drivers),
        }
    }

    /// Routes `scheme` to `kind`.
    ///
    /// # Returns
    /// `Ok(true)` if the pair was added, `Ok(false)` if it was already
    /// present, `Err(SchemeConflict)` if the scheme routes elsewhere.
    pub fn register(&self, scheme: &str, kind: DriverKind) -> Result<bool> {
        let scheme = scheme.to_ascii_lowercase();
        let mut drivers = self
            .drivers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match drivers.get(&scheme) {
            Some(existing) if *existing == kind => Ok(false),
            Some(existing) => Err(DialectError::SchemeConflict {
                scheme,
                existing: existing.to_string(),
                requested: kind.to_string(),
            }),
            None => {
                tracing::debug!("Registered scheme '{}' -> {}", scheme, kind);
                drivers.insert(scheme, kind);
                Ok(true)
            }
        }
    }

    /// Looks up the driver for a scheme (case-insensitive).
    pub fn resolve(&self, scheme: &str) -> Result<DriverKind> {
        let drivers = self
            .drivers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drivers
            .get(&scheme.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| DialectError::UnknownScheme(scheme.to_string()))
    }

    /// Registered schemes in sorted order.
    pub fn schemes(&self) -> Vec<String> {
        let drivers = self
            .drivers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drivers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.resolve("iotdb").unwrap(), DriverKind::IotdbRest);
        assert_eq!(registry.resolve("IoTDB").unwrap(), DriverKind::IotdbRest);
        assert_eq!(registry.schemes(), vec!["iotdb"]);
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let registry = Registry::new();
        assert!(registry.register("iotdb", DriverKind::IotdbRest).unwrap());
        assert!(!registry.register("iotdb", DriverKind::IotdbRest).unwrap());
        assert_eq!(registry.resolve("iotdb").unwrap(), DriverKind::IotdbRest);
        assert_eq!(registry.schemes().len(), 1);
    }

    #[test]
    fn test_register_over_defaults() {
        let registry = Registry::with_defaults();
        assert!(!registry.register("iotdb", DriverKind::IotdbRest).unwrap());
        assert!(registry.register("timeseries", DriverKind::IotdbRest).unwrap());
        assert_eq!(registry.schemes(), vec!["iotdb", "timeseries"]);
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = Registry::new();
        assert_eq!(
            registry.resolve("postgres"),
            Err(DialectError::UnknownScheme("postgres".to_string()))
        );
    }

    #[test]
    fn test_driver_dialect() {
        assert_eq!(DriverKind::IotdbRest.dialect().name(), "iotdb");
        assert_eq!(DriverKind::IotdbRest.to_string(), "iotdb-rest");
    }
}
