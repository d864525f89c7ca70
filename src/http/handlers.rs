//! Route handlers.
//!
//! Deliberately thin: they exist so the middleware has something to wrap.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;

use crate::http::errors::record_private_error;
use crate::observability::MetricsRecorder;

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsRecorder>,
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(Debug, Deserialize)]
pub struct PingParams {
    pub temp: Option<String>,
}

/// `GET /ping[?temp=<degrees>]`
///
/// A parseable `temp` updates the temperature gauge. A bad one still answers
/// `pong`; the parse failure goes to the access log only.
pub async fn ping(State(state): State<AppState>, Query(params): Query<PingParams>) -> Response {
    let mut response = Json(json!({ "msg": "pong" })).into_response();

    if let Some(raw) = params.temp {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => state.metrics.set_gauge(value),
            Ok(_) => {
                record_private_error(&mut response, format_args!("temp '{raw}' is not finite"))
            }
            Err(e) => record_private_error(&mut response, format_args!("temp '{raw}': {e}")),
        }
    }

    response
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// Prometheus text exposition of everything recorded so far.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
