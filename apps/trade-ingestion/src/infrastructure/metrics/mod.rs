//! Prometheus Metrics Module
//!
//! Installs the Prometheus recorder behind the `metrics` facade and
//! describes the counters the pipeline and the API record.
//!
//! Metrics are exposed at `/metrics` on the API port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::pipeline::{
    BATCH_WRITE_SECONDS, BATCHES_EMITTED, BATCHES_FAILED, BATCHES_WRITTEN, FILES_FAILED,
    FILES_PARSED, RECORDS_PARSED, RECORDS_SKIPPED, TRADES_WRITTEN,
};

const API_REQUESTS: &str = "trade_api_requests_total";
const API_REQUEST_SECONDS: &str = "trade_api_request_seconds";

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Idempotent: later calls return the handle from the first one.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Parse stage
    describe_counter!(FILES_PARSED, "Dump files read to the end");
    describe_counter!(FILES_FAILED, "Dump files abandoned on open or read failure");
    describe_counter!(RECORDS_PARSED, "Records turned into trades");
    describe_counter!(RECORDS_SKIPPED, "Malformed records skipped");

    // Aggregation and persistence
    describe_counter!(BATCHES_EMITTED, "Batches handed to persistence workers");
    describe_counter!(BATCHES_WRITTEN, "Batches committed to the store");
    describe_counter!(BATCHES_FAILED, "Batches dropped after a store error");
    describe_counter!(TRADES_WRITTEN, "Trades committed to the store");
    describe_histogram!(BATCH_WRITE_SECONDS, "Bulk insert latency per batch");

    // API
    describe_counter!(API_REQUESTS, "Metrics API requests by status code");
    describe_histogram!(API_REQUEST_SECONDS, "Metrics API request latency");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one metrics API request.
pub fn record_api_request(status: u16, duration: Duration) {
    counter!(API_REQUESTS, "status" => status.to_string()).increment(1);
    histogram!(API_REQUEST_SECONDS).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_api_request(200, Duration::from_millis(3));
    }
}
