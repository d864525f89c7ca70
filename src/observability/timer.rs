//! Request latency measurement.

use std::time::{Duration, Instant};

/// Monotonic stopwatch started when a request enters the middleware.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    started: Instant,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed milliseconds with sub-millisecond precision.
    pub fn elapsed_millis(&self) -> f64 {
        duration_millis(self.elapsed())
    }
}

/// Nanosecond-resolution conversion to fractional milliseconds.
pub fn duration_millis(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / 1_000_000.0
}
