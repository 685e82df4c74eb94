//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graceful_tasks_registered_total` (counter): tasks ever started
//! - `graceful_tasks_outstanding` (gauge): tasks started and not yet returned
//! - `graceful_task_failures_total` (counter): errors and panics reported by tasks
//! - `graceful_drain_duration_seconds` (histogram): cancel-to-drain time
//! - `graceful_shutdowns_total` (counter): by `outcome` (drained, timed_out)
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::Outcome;

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_task_started(outstanding: usize) {
    metrics::counter!("graceful_tasks_registered_total").increment(1);
    record_outstanding(outstanding);
}

pub fn record_outstanding(outstanding: usize) {
    metrics::gauge!("graceful_tasks_outstanding").set(outstanding as f64);
}

pub fn record_task_failure() {
    metrics::counter!("graceful_task_failures_total").increment(1);
}

pub fn record_shutdown(outcome: &Outcome, drain: Duration) {
    let label = match outcome {
        Outcome::Drained => "drained",
        Outcome::TimedOut { .. } => "timed_out",
    };
    metrics::counter!("graceful_shutdowns_total", "outcome" => label).increment(1);
    metrics::histogram!("graceful_drain_duration_seconds").record(drain.as_secs_f64());
}
