//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → filter.rs (exempt /healthz and /static?)
//!     → span.rs (active span) + timer.rs (start)
//!     → wrapped handler
//!     → headers.rs (client-identity headers) + trace_id.rs (correlation ids)
//!     → access_log.rs (one structured record → LogSink)
//!     → metrics.rs (request counter, temperature gauge)
//! ```
//!
//! `middleware.rs` drives the flow; `tracing.rs` installs the subscriber and
//! opens the request span the middleware reads from.

pub mod access_log;
pub mod filter;
pub mod headers;
pub mod metrics;
pub mod middleware;
pub mod span;
pub mod timer;
pub mod trace_id;
pub mod tracing;

pub use access_log::{LogRecord, LogSink};
pub use metrics::MetricsRecorder;
pub use middleware::{observe_request, ObservabilityContext};
pub use trace_id::TraceIdNormalizer;
