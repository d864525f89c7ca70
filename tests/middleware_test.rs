//! Observability middleware driven through the full server router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use request_observer::config::AppConfig;
use request_observer::http::HttpServer;
use request_observer::observability::TraceIdNormalizer;
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

mod common;

use common::{FixedSpans, MemorySink};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_trace_context_flows_into_access_log() {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let provider = TracerProvider::builder().build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));
    let _default = tracing::subscriber::set_default(subscriber);

    let sink = Arc::new(MemorySink::default());
    let (ctx, metrics) = common::context(sink.clone());
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    let request = Request::builder()
        .uri("/ping?temp=21.5")
        .header("x-real-ip", "9.9.9.9")
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.http.status, 200);
    assert_eq!(record.http.method, "GET");
    assert_eq!(record.http.path, "/ping");
    assert_eq!(record.http.query, "temp=21.5");
    assert_eq!(record.http.error, "");
    assert_eq!(record.http.headers.len(), 1);
    assert_eq!(record.http.headers["x-real-ip"], "9.9.9.9");
    assert!(record.http.latency > 0.0);

    assert_eq!(record.dd.service, "request-observer");
    assert_eq!(record.dd.version, "test");
    assert_eq!(record.dd.env, "ci");
    let expected_trace = u64::from_str_radix("a3ce929d0e0e4736", 16).unwrap();
    assert_eq!(record.dd.trace_id, expected_trace.to_string());
    // The request span is a child of the remote span, so it has its own id.
    assert!(!record.dd.span_id.is_empty());
    assert!(record.dd.span_id.bytes().all(|b| b.is_ascii_digit()));
    assert_ne!(record.dd.span_id, "67667974448284343");

    assert_eq!(metrics.total_requests(), 1);
    assert_eq!(metrics.gauge_value(), Some(21.5));
}

#[tokio::test]
async fn test_no_tracer_leaves_correlation_empty() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, _) = common::context(sink.clone());
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    server.router().oneshot(get("/ping")).await.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dd.trace_id, "");
    assert_eq!(records[0].dd.span_id, "");
    assert_eq!(records[0].dd.service, "request-observer");
}

#[tokio::test]
async fn test_native_decimal_ids_pass_through() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, _) = common::context(sink.clone());
    let ctx = ctx
        .with_normalizer(TraceIdNormalizer::NativeDecimal)
        .with_span_source(Arc::new(FixedSpans {
            trace_id: "5577006791947779410".into(),
            span_id: "8674665223082153551".into(),
        }));
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    server.router().oneshot(get("/ping")).await.unwrap();

    let dd = &sink.records()[0].dd;
    assert_eq!(dd.trace_id, "5577006791947779410");
    assert_eq!(dd.span_id, "8674665223082153551");
}

#[tokio::test]
async fn test_malformed_ids_do_not_drop_the_record() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, _) = common::context(sink.clone());
    let ctx = ctx.with_span_source(Arc::new(FixedSpans {
        trace_id: "not-a-hex-trace-id-at-all".into(),
        span_id: "short".into(),
    }));
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    let response = server.router().oneshot(get("/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dd.trace_id, "");
    assert_eq!(records[0].dd.span_id, "");
}

#[tokio::test]
async fn test_health_check_is_served_but_not_observed() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, metrics) = common::context(sink.clone());
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    let response = server.router().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(&body[..], b"ok");

    assert!(sink.records().is_empty());
    assert_eq!(metrics.total_requests(), 0);
}

#[tokio::test]
async fn test_bad_temperature_is_a_private_error() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, metrics) = common::context(sink.clone());
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    let response = server.router().oneshot(get("/ping?temp=warm")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(&body[..], br#"{"msg":"pong"}"#);

    let error = &sink.records()[0].http.error;
    assert!(error.starts_with("Error #01: temp 'warm'"), "{error}");
    assert_eq!(metrics.gauge_value(), None);
}

#[tokio::test]
async fn test_metrics_route_without_recorder() {
    let sink = Arc::new(MemorySink::default());
    let (ctx, _) = common::context(sink.clone());
    let server = HttpServer::new(AppConfig::default(), Arc::new(ctx), None);

    let response = server.router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // The scrape route is not exempt.
    assert_eq!(sink.records()[0].http.path, "/metrics");
}
