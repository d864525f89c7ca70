//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::KeyValue;
use request_observer::observability::access_log::{
    LogRecord, LogSink, ServiceTags, StaticServiceInfo,
};
use request_observer::observability::metrics::install_prometheus;
use request_observer::observability::span::{SpanHandle, SpanSource};
use request_observer::observability::{MetricsRecorder, ObservabilityContext};

/// Collects every emitted record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

/// A span whose ids are decided by the test.
pub struct FixedSpan {
    pub trace_id: String,
    pub span_id: String,
}

impl SpanHandle for FixedSpan {
    fn trace_id(&self) -> String {
        self.trace_id.clone()
    }

    fn span_id(&self) -> String {
        self.span_id.clone()
    }

    fn set_attribute(&self, _attribute: KeyValue) {}
}

/// Hands out the same ids for every request.
pub struct FixedSpans {
    pub trace_id: String,
    pub span_id: String,
}

impl SpanSource for FixedSpans {
    fn current_span(&self) -> Box<dyn SpanHandle> {
        Box::new(FixedSpan {
            trace_id: self.trace_id.clone(),
            span_id: self.span_id.clone(),
        })
    }
}

pub fn service_tags() -> Arc<StaticServiceInfo> {
    Arc::new(StaticServiceInfo(ServiceTags {
        service: "request-observer".into(),
        version: "test".into(),
        env: "ci".into(),
    }))
}

/// Context writing to `sink`, with fixed service tags and a private recorder.
pub fn context(sink: Arc<MemorySink>) -> (ObservabilityContext, Arc<MetricsRecorder>) {
    let metrics = Arc::new(MetricsRecorder::new());
    let ctx = ObservabilityContext::new(sink)
        .with_service_info(service_tags())
        .with_metrics(metrics.clone());
    (ctx, metrics)
}

/// The process-wide Prometheus recorder, installed on first use.
pub fn prometheus() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| install_prometheus().expect("install Prometheus recorder"))
        .clone()
}
