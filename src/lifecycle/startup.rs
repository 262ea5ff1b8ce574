//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and begin accepting traffic
//! - Release the gateway once the server has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use metrics_exporter_prometheus::BuildError;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::forward::{ReqwestTransport, TransportError};
use crate::gateway::{EventGateway, GatewayError};
use crate::http::RelayServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to create event gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid metrics address {address:?}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind the configured address and serve until `shutdown` fires.
pub async fn run(config: RelayConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|source| {
            StartupError::MetricsAddress {
                address: config.observability.metrics_address.clone(),
                source,
            }
        })?;
        metrics::init_metrics(addr)?;
    }

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    serve(config, listener, shutdown).await
}

/// Serve on an already bound listener until `shutdown` fires.
pub async fn serve(
    config: RelayConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    tracing::info!(
        downstream = %config.downstream.url,
        webhook_id = %config.downstream.webhook_id,
        timeout_secs = config.downstream.timeout_secs,
        "Configuration loaded"
    );

    let transport = ReqwestTransport::new(&config.downstream.transport_config())?;
    let gateway = Arc::new(EventGateway::new(
        config.downstream.gateway_config(),
        Arc::new(transport),
    )?);

    let server = RelayServer::new(&config, gateway.clone(), shutdown);
    let result = server.run(listener).await.map_err(StartupError::Serve);

    gateway.close();
    tracing::info!("Shutdown complete");
    result
}
