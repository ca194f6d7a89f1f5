//! End-to-end introspection scenario for the IoTDB dialect.
//!
//! Provisions a disposable IoTDB server (or uses an existing one), connects
//! an engine through the driver registry, and runs the scenario in
//! [`scenario`], returning a [`TestReport`] instead of aborting on the
//! first failed check.

pub mod config;
pub mod container;
pub mod error;
pub mod report;
pub mod scenario;

use iotdb_dialect::{ConnectionUrl, Engine, Registry};

pub use config::HarnessConfig;
pub use container::IotdbContainer;
pub use error::{HarnessError, Result};
pub use report::{CheckOutcome, TestReport};
pub use scenario::run_scenario;

/// Starts a container, runs the scenario against it and removes it.
///
/// # Arguments
///
/// * `config` - Image, ports, credentials and engine settings
/// * `registry` - Registry resolving `config.scheme`
///
/// # Returns
///
/// The scenario report, or the provisioning or connection error. The
/// container is removed on both paths.
pub async fn run_with_container(config: &HarnessConfig, registry: &Registry) -> Result<TestReport> {
    let container = IotdbContainer::start(config).await?;
    let url = config.connection_url(container.host(), container.rest_port());
    let result = run_against(config, registry, &url).await;
    container.stop().await;
    result
}

/// Runs the scenario against an already running server.
pub async fn run_against(
    config: &HarnessConfig,
    registry: &Registry,
    url: &ConnectionUrl,
) -> Result<TestReport> {
    let engine = Engine::connect(registry, url, config.engine.clone())?;
    let report = run_scenario(&engine).await;
    Ok(report)
}
