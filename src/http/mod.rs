//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request span, observability middleware)
//!     → handlers.rs (ping / healthz / metrics)
//!     → errors.rs (private errors carried on the response to the access log)
//!     → Send to client
//! ```

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{record_private_error, PrivateErrors};
pub use server::HttpServer;
