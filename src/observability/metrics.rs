//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): observed requests by status, method
//! - `app_temperature` (gauge): last reported temperature
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; whichever recorder is
//!   installed (Prometheus in the binary) owns exposition
//! - The gauge's current value is also kept behind a mutex so concurrent
//!   writers and the scrape path never see a torn value

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const APP_TEMPERATURE: &str = "app_temperature";

/// Register metric descriptions. Called once after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        Unit::Count,
        "Number of observed HTTP requests"
    );
    describe_gauge!(APP_TEMPERATURE, "Last reported temperature in degrees");
}

/// Install the Prometheus recorder and return the handle used for scraping.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Request counter and temperature gauge.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    requests: AtomicU64,
    temperature: Mutex<Option<f64>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request.
    pub fn increment_request_counter(&self, status: u16, method: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter!(
            HTTP_REQUESTS_TOTAL,
            "status" => status.to_string(),
            "method" => method.to_string()
        )
        .increment(1);
    }

    /// Replace the gauge value.
    pub fn set_gauge(&self, value: f64) {
        // Publishing under the lock keeps the exported value in step with the stored one.
        let mut current = self
            .temperature
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(value);
        gauge!(APP_TEMPERATURE).set(value);
    }

    /// Last value passed to [`set_gauge`](Self::set_gauge), if any.
    pub fn gauge_value(&self) -> Option<f64> {
        *self
            .temperature
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Requests counted by this recorder across all labels.
    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
