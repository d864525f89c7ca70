//! Crate-level error type.
//!
//! Only startup can fail. Request handling degrades to empty log fields instead.

use metrics_exporter_prometheus::BuildError;

use crate::config::ConfigError;
use crate::observability::tracing::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(#[from] BuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
