//! Distributed tracing and log subscriber setup.
//!
//! # Responsibilities
//! - Install the `tracing` subscriber (env filter + JSON or pretty output)
//! - Install an OpenTelemetry tracer provider behind `tracing-opentelemetry`
//!   so request spans carry W3C trace/span ids
//! - Extract inbound trace context and open one span per observed request
//!
//! # Design Decisions
//! - No span exporter is configured here; ids are still generated so logs
//!   correlate with whatever backend the deployment attaches
//! - W3C Trace Context is the only propagation format

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::filter::should_observe;

/// Error type for telemetry initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to set global subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Handle for the telemetry lifecycle.
///
/// Call `shutdown()` once the server has stopped.
pub struct TelemetryHandle {
    tracer_provider: Option<TracerProvider>,
}

impl TelemetryHandle {
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                tracing::error!("Failed to shutdown tracer provider: {}", e);
            }
        }
    }
}

/// Install the global subscriber, tracer provider and propagator.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<TelemetryHandle, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    let tracer_provider = config.tracing_enabled.then(|| {
        TracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .build()
    });
    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.tracer_name.clone()))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    global::set_text_map_propagator(TraceContextPropagator::new());
    if let Some(provider) = &tracer_provider {
        global::set_tracer_provider(provider.clone());
    }

    tracing::debug!(
        tracing_enabled = config.tracing_enabled,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(TelemetryHandle { tracer_provider })
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// `TraceLayer` span factory.
///
/// Exempt paths get a disabled span so they never reach the tracer. Observed
/// requests continue the caller's trace when a `traceparent` header is sent.
pub fn make_request_span(request: &Request<Body>) -> tracing::Span {
    if !should_observe(request.uri().path()) {
        return tracing::Span::none();
    }

    let parent_cx =
        global::get_text_map_propagator(|prop| prop.extract(&HeaderExtractor(request.headers())));

    let span = tracing::info_span!(
        "http_request",
        otel.kind = "server",
        method = %request.method(),
        path = %request.uri().path(),
    );
    span.set_parent(parent_cx);
    span
}
