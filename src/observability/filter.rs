//! Request filter deciding which requests are traced and logged.
//!
//! Health probes and static assets are exempt. The handler for an exempt
//! request still runs; only the instrumentation around it is skipped.

/// Health-check path, matched exactly.
pub const HEALTH_CHECK_PATH: &str = "/healthz";

/// Prefix of static asset paths.
pub const STATIC_PREFIX: &str = "/static";

/// Returns true if a request for `path` participates in tracing and logging.
pub fn should_observe(path: &str) -> bool {
    !(path == HEALTH_CHECK_PATH || path.starts_with(STATIC_PREFIX))
}
