//! Access to the span of the request being observed.
//!
//! The middleware only needs to read ids from the active span and set an
//! attribute on it. Whichever tracing backend is wired in implements
//! [`SpanHandle`]; the OpenTelemetry-backed one reads the `tracing` span that
//! `tower-http`'s `TraceLayer` opened for the request.

use opentelemetry::trace::TraceContextExt;
use opentelemetry::KeyValue;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Capability over the active span, held for one request only.
pub trait SpanHandle: Send + Sync {
    /// Trace id in the backend's native encoding, empty if there is none.
    fn trace_id(&self) -> String;

    /// Span id in the backend's native encoding, empty if there is none.
    fn span_id(&self) -> String;

    fn set_attribute(&self, attribute: KeyValue);
}

/// Looks up the span of the request currently being handled.
pub trait SpanSource: Send + Sync {
    fn current_span(&self) -> Box<dyn SpanHandle>;
}

/// OpenTelemetry span attached to a `tracing` span.
///
/// Ids are read once when the handle is created; the parent is already set by
/// then, so they cannot change for the rest of the request.
#[derive(Debug, Clone)]
pub struct OtelSpan {
    span: tracing::Span,
    trace_id: String,
    span_id: String,
}

impl OtelSpan {
    pub fn new(span: tracing::Span) -> Self {
        let cx = span.context();
        let otel_span = cx.span();
        let span_context = otel_span.span_context();
        let (trace_id, span_id) = if span_context.is_valid() {
            (
                span_context.trace_id().to_string(),
                span_context.span_id().to_string(),
            )
        } else {
            (String::new(), String::new())
        };
        Self {
            span,
            trace_id,
            span_id,
        }
    }
}

impl SpanHandle for OtelSpan {
    fn trace_id(&self) -> String {
        self.trace_id.clone()
    }

    fn span_id(&self) -> String {
        self.span_id.clone()
    }

    fn set_attribute(&self, attribute: KeyValue) {
        self.span.set_attribute(attribute.key, attribute.value);
    }
}

/// Resolves to `tracing::Span::current()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentOtelSpan;

impl SpanSource for CurrentOtelSpan {
    fn current_span(&self) -> Box<dyn SpanHandle> {
        Box::new(OtelSpan::new(tracing::Span::current()))
    }
}
