//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by action, status
//! - `router_request_duration_seconds` (histogram): latency by action
//! - `router_backend_errors_total` (counter): upstream failures by backend, kind
//! - `router_table_reloads_total` (counter): refresh attempts by outcome
//! - `router_table_routes`, `router_table_backends` (gauges): live table size
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(action: &'static str, status: u16, start: Instant) {
    counter!("router_requests_total", "action" => action, "status" => status.to_string())
        .increment(1);
    histogram!("router_request_duration_seconds", "action" => action)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_error(backend: &str, kind: &'static str) {
    counter!("router_backend_errors_total", "backend" => backend.to_string(), "kind" => kind)
        .increment(1);
}

pub fn record_reload(outcome: &'static str) {
    counter!("router_table_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_table_size(routes: usize, backends: usize) {
    gauge!("router_table_routes").set(routes as f64);
    gauge!("router_table_backends").set(backends as f64);
}
