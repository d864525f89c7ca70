//! Request observability for HTTP services.
//!
//! Wraps every request in an access log record correlated with its trace,
//! and feeds request counters and a temperature gauge.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::Error;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::{observe_request, ObservabilityContext};
