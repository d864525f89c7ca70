//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (addresses parse, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Paths the server routes itself.
const RESERVED_PATHS: [&str; 2] = ["/ping", "/healthz"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.listener.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.shutdown_timeout_secs",
            "must be greater than zero",
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    let metrics_path = config.observability.metrics_path.as_str();
    if config.observability.metrics_enabled {
        if !metrics_path.starts_with('/') {
            errors.push(ValidationError::new(
                "observability.metrics_path",
                "must start with '/'",
            ));
        } else if RESERVED_PATHS.contains(&metrics_path) {
            errors.push(ValidationError::new(
                "observability.metrics_path",
                format!("'{metrics_path}' is already routed"),
            ));
        }
    }

    let service = &config.service;
    for (field, name) in [
        ("service.service_env", &service.service_env),
        ("service.version_env", &service.version_env),
        ("service.env_env", &service.env_env),
    ] {
        if name.is_empty() {
            errors.push(ValidationError::new(field, "variable name is empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
