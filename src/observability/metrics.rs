//! Metrics collection and exposition.
//!
//! # Metrics
//! - `owl_updates_total` (counter): applied values by key
//! - `owl_coercion_failures_total` (counter): rejected values by key
//! - `owl_watch_restarts_total` (counter): subscription reopenings by key
//! - `owl_active_watchers` (gauge): running watch loops
//! - `owl_snapshot_keys` (gauge): bound keys seeded by the last snapshot
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are fully-qualified keys, bounded by the schema size

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_update(key: &str) {
    counter!("owl_updates_total", "key" => key.to_string()).increment(1);
}

pub fn record_coercion_failure(key: &str) {
    counter!("owl_coercion_failures_total", "key" => key.to_string()).increment(1);
}

pub fn record_watch_restart(key: &str) {
    counter!("owl_watch_restarts_total", "key" => key.to_string()).increment(1);
}

pub fn record_watcher_started() {
    gauge!("owl_active_watchers").increment(1.0);
}

pub fn record_watcher_stopped() {
    gauge!("owl_active_watchers").decrement(1.0);
}

pub fn record_snapshot_keys(count: usize) {
    gauge!("owl_snapshot_keys").set(count as f64);
}
