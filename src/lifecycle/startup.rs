//! Startup orchestration.
//!
//! Initializes subsystems in dependency order: telemetry first so every later
//! step can log, then the metrics recorder, then the observability context and
//! server, and the listener last so traffic only arrives once all is ready.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::error::Error;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::install_prometheus;
use crate::observability::tracing::init_telemetry;
use crate::observability::ObservabilityContext;

/// Run the service until a shutdown signal, then flush telemetry.
pub async fn run(config: AppConfig) -> Result<(), Error> {
    let telemetry = init_telemetry(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        metrics_enabled = config.observability.metrics_enabled,
        tracing_enabled = config.observability.tracing_enabled,
        trace_id_format = ?config.observability.trace_id_format,
        trust_forwarded_for = config.access_log.trust_forwarded_for,
        "Configuration loaded"
    );

    let prometheus = if config.observability.metrics_enabled {
        Some(install_prometheus()?)
    } else {
        None
    };

    let observability = Arc::new(ObservabilityContext::from_config(&config));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, observability, prometheus);
    let result = server.run(listener, shutdown.subscribe()).await;

    telemetry.shutdown();
    result.map_err(Error::from)
}
