//! Disposable IoTDB server in a container.

use std::time::Instant;

use iotdb_dialect::{ConnectionUrl, EngineConfig, RestTransport, Transport};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls the native port and the REST service behind `url` until both
/// answer.
///
/// # Arguments
///
/// * `url` - Connection URL of the REST service
/// * `host` - Host of the native protocol port
/// * `native_port` - Mapped native protocol port
/// * `deadline` - Instant after which the wait fails
///
/// # Returns
///
/// `Ok(())` once both answer, or `HarnessError::Provision` naming the
/// service that never did.
pub(crate) async fn wait_until_ready(
    url: &ConnectionUrl,
    host: &str,
    native_port: u16,
    deadline: Instant,
) -> Result<()> {
    loop {
        match TcpStream::connect((host, native_port)).await {
            Ok(_) => break,
            Err(e) if Instant::now() >= deadline => {
                return Err(HarnessError::Provision(format!(
                    "native port {}:{} not reachable: {}",
                    host, native_port, e
                )));
            }
            Err(e) => {
                tracing::debug!("Native port not ready yet: {}", e);
                sleep(READY_POLL_INTERVAL).await;
            }
        }
    }

    let probe = RestTransport::new(url, &EngineConfig::default());
    loop {
        match probe.ping().await {
            Ok(()) => return Ok(()),
            Err(e) if Instant::now() >= deadline => {
                return Err(HarnessError::Provision(format!(
                    "REST service at {} not ready: {}",
                    url.redacted(),
                    e
                )));
            }
            Err(e) => {
                tracing::debug!("REST service not ready yet: {}", e);
                sleep(READY_POLL_INTERVAL).await;
            }
        }
    }
}

/// Running IoTDB container. Dropping it removes the container.
pub struct IotdbContainer {
    inner: ContainerAsync<GenericImage>,
    host: String,
    native_port: u16,
    rest_port: u16,
}

impl IotdbContainer {
    /// Starts the image with the REST service enabled and waits until it
    /// answers `/ping`.
    pub async fn start(config: &HarnessConfig) -> Result<Self> {
        let started = Instant::now();
        tracing::info!("Starting container {}:{}", config.image, config.tag);

        let inner = GenericImage::new(config.image.as_str(), config.tag.as_str())
            .with_exposed_port(config.native_port.tcp())
            .with_exposed_port(config.rest_port.tcp())
            .with_wait_for(WaitFor::message_on_stdout(config.ready_message.as_str()))
            .with_env_var("enable_rest_service", "true")
            .with_env_var("rest_service_port", config.rest_port.to_string())
            .with_startup_timeout(config.startup_timeout())
            .start()
            .await?;

        let host = inner.get_host().await?.to_string();
        let native_port = inner.get_host_port_ipv4(config.native_port.tcp()).await?;
        let rest_port = inner.get_host_port_ipv4(config.rest_port.tcp()).await?;
        tracing::info!(
            "Container {} up: native {}:{}, rest {}:{}",
            inner.id(),
            host,
            native_port,
            host,
            rest_port
        );

        let container = Self {
            inner,
            host,
            native_port,
            rest_port,
        };
        container
            .wait_ready(config, started + config.startup_timeout())
            .await?;
        Ok(container)
    }

    /// Waits until the mapped native port accepts connections and the
    /// mapped REST port answers `/ping`, or `deadline` passes.
    async fn wait_ready(&self, config: &HarnessConfig, deadline: Instant) -> Result<()> {
        let url = config.connection_url(self.host(), self.rest_port());
        wait_until_ready(&url, self.host(), self.native_port(), deadline).await
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host port mapped to the native protocol port.
    pub fn native_port(&self) -> u16 {
        self.native_port
    }

    /// Host port mapped to the REST port.
    pub fn rest_port(&self) -> u16 {
        self.rest_port
    }

    /// Stops and removes the container.
    pub async fn stop(self) {
        let id = self.inner.id().to_string();
        if let Err(e) = self.inner.rm().await {
            tracing::warn!("Failed to remove container {}: {}", id, e);
        } else {
            tracing::info!("Removed container {}", id);
        }
    }
}
