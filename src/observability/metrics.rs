//! Metrics collection and exposition.
//!
//! # Metrics
//! - `configd_commits_total` (counter): commits by section and outcome
//! - `configd_admission_conflicts_total` (counter): mutations refused by the admission lock
//! - `configd_radius_attempts_total` (counter): Access-Requests by server and result
//! - `configd_tasks_total` (counter): finished tasks by final state

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

const COMMITS_TOTAL: &str = "configd_commits_total";
const ADMISSION_CONFLICTS_TOTAL: &str = "configd_admission_conflicts_total";
const RADIUS_ATTEMPTS_TOTAL: &str = "configd_radius_attempts_total";
const TASKS_TOTAL: &str = "configd_tasks_total";

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {}", e))?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// `outcome` is one of applied, rejected, conflict, failed, rolled_back_failed.
#[inline]
pub fn record_commit(section: &'static str, outcome: &'static str) {
    counter!(COMMITS_TOTAL, "section" => section, "outcome" => outcome).increment(1);
}

#[inline]
pub fn record_admission_conflict() {
    counter!(ADMISSION_CONFLICTS_TOTAL).increment(1);
}

/// `result` is one of accept, reject, error.
#[inline]
pub fn record_radius_attempt(server: &str, result: &'static str) {
    counter!(RADIUS_ATTEMPTS_TOTAL, "server" => server.to_string(), "result" => result).increment(1);
}

#[inline]
pub fn record_task(state: &'static str) {
    counter!(TASKS_TOTAL, "state" => state).increment(1);
}
