//! request-observer
//!
//! HTTP service whose every request produces one access log line correlated
//! with its OpenTelemetry trace.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ TraceLayer (request span, W3C parent)
//!                 │
//!                 ▼
//!            observe_request ──▶ filter ──▶ timer + span ids + client headers
//!                 │
//!                 ▼
//!            /ping  /healthz  /metrics
//!                 │
//!                 ▼
//!            access log record ──▶ stdout JSON line
//!            http_requests_total, app_temperature ──▶ /metrics
//! ```

use std::path::PathBuf;

use clap::Parser;

use request_observer::config::{load_config, validation::validate_config, AppConfig, ConfigError};
use request_observer::lifecycle::startup;

#[derive(Parser)]
#[command(name = "request-observer")]
#[command(about = "HTTP service with trace-correlated access logging", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    startup::run(config).await?;
    Ok(())
}
