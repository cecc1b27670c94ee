//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method and status
//! - `db_pool_acquisitions_total` (counter): leases handed out
//! - `db_pool_acquire_seconds` (histogram): time to obtain a lease
//! - `db_pool_acquire_timeouts_total` (counter): acquires that timed out
//! - `db_pool_connect_errors_total` (counter): failed connection attempts
//! - `db_pool_evictions_total` (counter): idle connections closed by the reaper
//! - `db_pool_idle_connections` (gauge): current idle set size
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The Prometheus exporter is opt-in via `METRICS_ADDRESS`

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_pool_acquire(wait: Duration) {
    counter!("db_pool_acquisitions_total").increment(1);
    histogram!("db_pool_acquire_seconds").record(wait.as_secs_f64());
}

pub fn record_pool_timeout() {
    counter!("db_pool_acquire_timeouts_total").increment(1);
}

pub fn record_pool_connect_error() {
    counter!("db_pool_connect_errors_total").increment(1);
}

pub fn record_pool_evictions(count: usize) {
    counter!("db_pool_evictions_total").increment(count as u64);
}

pub fn record_pool_idle(count: usize) {
    gauge!("db_pool_idle_connections").set(count as f64);
}
