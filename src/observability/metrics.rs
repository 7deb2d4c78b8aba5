//! Metrics collection and exposition.
//!
//! # Metrics
//! - `enricher_requests_total` (counter): upload outcomes by kind
//! - `enricher_rate_limited_total` (counter): denials by budget
//! - `enricher_enrichment_duration_seconds` (histogram): external call latency
//! - `enricher_temp_cleanup_failures_total` (counter): temp files that could not be removed
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str) {
    counter!("enricher_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited(budget: &str) {
    counter!("enricher_rate_limited_total", "budget" => budget.to_string()).increment(1);
}

pub fn record_enrichment(start_time: Instant, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    histogram!("enricher_enrichment_duration_seconds", "result" => result)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_cleanup_failure() {
    counter!("enricher_temp_cleanup_failures_total").increment(1);
}
