//! Metrics collection and exposition.
//!
//! # Metrics
//! - `raw_proxy_requests_total` (counter): client responses by status and credential source
//! - `raw_proxy_request_duration_seconds` (histogram): end-to-end handler latency
//! - `raw_proxy_upstream_duration_seconds` (histogram): upstream fetch latency by status
//! - `raw_proxy_store_errors_total` (counter): failed key-value lookups
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, source: &'static str, start: Instant) {
    counter!(
        "raw_proxy_requests_total",
        "status" => status.to_string(),
        "source" => source
    )
    .increment(1);
    histogram!("raw_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream(status: u16, start: Instant) {
    histogram!(
        "raw_proxy_upstream_duration_seconds",
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_store_error() {
    counter!("raw_proxy_store_errors_total").increment(1);
}
