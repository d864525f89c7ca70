//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, shutdown drain).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Access log settings.
    pub access_log: AccessLogConfig,

    /// Where the service/version/env correlation tags come from.
    pub service: ServiceConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Upper bound on connection draining during graceful shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            shutdown_timeout_secs: 15,
        }
    }
}

/// Encoding of the trace/span ids exposed by the tracing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceIdFormat {
    /// W3C hex ids (32 chars for traces, 16 for spans), folded to 64-bit decimal.
    #[default]
    Hex128,
    /// Ids already rendered as 64-bit decimal integers.
    Decimal,
}

/// Operational log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Operational log format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape route.
    pub metrics_enabled: bool,

    /// Path of the scrape route on the main router.
    pub metrics_path: String,

    /// Install the OpenTelemetry tracer provider and span layer.
    pub tracing_enabled: bool,

    /// Instrumentation scope name for the tracer.
    pub tracer_name: String,

    /// How trace/span ids are converted into log correlation ids.
    pub trace_id_format: TraceIdFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            tracing_enabled: true,
            tracer_name: "request-observer".to_string(),
            trace_id_format: TraceIdFormat::Hex128,
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Prefer `X-Forwarded-For` / `X-Real-IP` over the peer address for `http.client`.
    pub trust_forwarded_for: bool,
}

/// Names of the environment variables holding the correlation tags.
///
/// Values are looked up on every emitted record, never cached.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service_env: String,
    pub version_env: String,
    pub env_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_env: "DD_SERVICE".to_string(),
            version_env: "DD_VERSION".to_string(),
            env_env: "DD_ENV".to_string(),
        }
    }
}
