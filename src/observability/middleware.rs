//! Request observability middleware.
//!
//! # Request lifecycle
//! ```text
//! Idle → Filtering ─┬─ exempt path ──→ Skipped (handler runs, nothing recorded)
//!                   └─ observed ─────→ Observing → Completed
//! ```
//!
//! While observing, the active span and client metadata are captured and the
//! timer runs across the wrapped handler. Completion always emits exactly one
//! access log record and counts the request, whether the handler returned,
//! panicked (recorded as a 500) or was dropped mid-flight (recorded as 499).

use std::any::Any;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use opentelemetry::KeyValue;

use crate::config::AppConfig;
use crate::http::errors::{private_error_message, record_private_error};
use crate::observability::access_log::{
    DdFields, EnvServiceInfo, HttpFields, JsonLineSink, LogRecord, LogSink, ServiceInfo,
};
use crate::observability::filter::should_observe;
use crate::observability::headers::{extract_client_headers, forwarded_client};
use crate::observability::metrics::MetricsRecorder;
use crate::observability::span::{CurrentOtelSpan, SpanHandle, SpanSource};
use crate::observability::timer::RequestTimer;
use crate::observability::trace_id::TraceIdNormalizer;

/// Status recorded when the client goes away before the handler finishes.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

const STATUS_CODE_ATTRIBUTE: &str = "http.response.status_code";

/// Collaborators of the middleware, built once at startup.
pub struct ObservabilityContext {
    spans: Arc<dyn SpanSource>,
    normalizer: TraceIdNormalizer,
    sink: Arc<dyn LogSink>,
    service: Arc<dyn ServiceInfo>,
    metrics: Arc<MetricsRecorder>,
    trust_forwarded_for: bool,
}

impl ObservabilityContext {
    /// Context with OpenTelemetry spans, hex ids and `DD_*` environment tags.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            spans: Arc::new(CurrentOtelSpan),
            normalizer: TraceIdNormalizer::default(),
            sink,
            service: Arc::new(EnvServiceInfo::default()),
            metrics: Arc::new(MetricsRecorder::new()),
            trust_forwarded_for: false,
        }
    }

    /// Context writing JSON lines to stdout, configured from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(JsonLineSink::stdout())).with_config(config)
    }

    /// Apply the id format, service tag variables and client address policy.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_normalizer(config.observability.trace_id_format.into())
            .with_service_info(Arc::new(EnvServiceInfo::new(&config.service)))
            .with_trust_forwarded_for(config.access_log.trust_forwarded_for)
    }

    pub fn with_span_source(mut self, spans: Arc<dyn SpanSource>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_normalizer(mut self, normalizer: TraceIdNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_service_info(mut self, service: Arc<dyn ServiceInfo>) -> Self {
        self.service = service;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    fn dd_fields(&self, span: &dyn SpanHandle) -> DdFields {
        let tags = self.service.tags();
        DdFields {
            service: tags.service,
            version: tags.version,
            env: tags.env,
            trace_id: self.normalizer.normalize(&span.trace_id()),
            span_id: self.normalizer.normalize(&span.span_id()),
        }
    }
}

/// Everything captured about one request before its handler runs.
pub struct RequestObservation {
    timer: RequestTimer,
    method: String,
    path: String,
    query: String,
    proto: String,
    user_agent: String,
    client: String,
    headers: BTreeMap<String, String>,
    span: Box<dyn SpanHandle>,
}

impl RequestObservation {
    fn capture(request: &Request, span: Box<dyn SpanHandle>, trust_forwarded_for: bool) -> Self {
        let timer = RequestTimer::start();
        let headers = request.headers();

        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let client = trust_forwarded_for
            .then(|| forwarded_client(headers))
            .flatten()
            .or(peer)
            .unwrap_or_default();

        Self {
            timer,
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().unwrap_or_default().to_string(),
            proto: format!("{:?}", request.version()),
            user_agent: headers
                .get(axum::http::header::USER_AGENT)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default(),
            client,
            headers: extract_client_headers(headers),
            span,
        }
    }

    /// Emit the record and count the request. Consumes the observation.
    fn complete(self, ctx: &ObservabilityContext, status: u16, error: String) {
        let latency = self.timer.elapsed_millis();
        self.span
            .set_attribute(KeyValue::new(STATUS_CODE_ATTRIBUTE, i64::from(status)));

        let record = LogRecord {
            dd: ctx.dd_fields(self.span.as_ref()),
            http: HttpFields {
                status,
                client: self.client,
                method: self.method,
                path: self.path,
                query: self.query,
                user_agent: self.user_agent,
                proto: self.proto,
                headers: self.headers,
                latency,
                error,
            },
        };
        ctx.sink.emit(&record);
        ctx.metrics
            .increment_request_counter(record.http.status, &record.http.method);
    }
}

/// Completes an observation on drop if the request never reached completion.
struct ObservationGuard {
    ctx: Arc<ObservabilityContext>,
    observation: Option<RequestObservation>,
}

impl ObservationGuard {
    fn complete(mut self, response: &Response) {
        if let Some(observation) = self.observation.take() {
            observation.complete(
                &self.ctx,
                response.status().as_u16(),
                private_error_message(response),
            );
        }
    }
}

impl Drop for ObservationGuard {
    fn drop(&mut self) {
        if let Some(observation) = self.observation.take() {
            tracing::debug!(path = %observation.path, "Request dropped before completion");
            observation.complete(
                &self.ctx,
                CLIENT_CLOSED_REQUEST,
                "request cancelled".to_string(),
            );
        }
    }
}

/// Axum middleware wrapping every route with access logging and metrics.
///
/// Install with `axum::middleware::from_fn_with_state(ctx, observe_request)`,
/// inside the layer that opens the request span.
pub async fn observe_request(
    State(ctx): State<Arc<ObservabilityContext>>,
    request: Request,
    next: Next,
) -> Response {
    if !should_observe(request.uri().path()) {
        return next.run(request).await;
    }

    let span = ctx.spans.current_span();
    let observation = RequestObservation::capture(&request, span, ctx.trust_forwarded_for);
    let guard = ObservationGuard {
        ctx: ctx.clone(),
        observation: Some(observation),
    };

    let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(panic = %message, "Handler panicked");
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            record_private_error(&mut response, format_args!("panic: {message}"));
            response
        }
    };

    guard.complete(&response);
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
