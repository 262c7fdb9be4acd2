//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_accepted_total` (counter): inbound connections accepted
//! - `relay_dial_failures_total` (counter): failed dials by reason
//! - `relay_sessions_active` (gauge): sessions between accept and teardown
//! - `relay_bytes_total` (counter): relayed bytes by direction
//! - `relay_direction_failures_total` (counter): copy directions ending in error
//! - `relay_session_duration_seconds` (histogram): relay phase duration
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_accepted() {
    metrics::counter!("relay_sessions_accepted_total").increment(1);
}

pub fn record_dial_failure(reason: &'static str) {
    metrics::counter!("relay_dial_failures_total", "reason" => reason).increment(1);
}

pub fn record_session_opened() {
    metrics::gauge!("relay_sessions_active").increment(1.0);
}

pub fn record_session_released() {
    metrics::gauge!("relay_sessions_active").decrement(1.0);
}

pub fn record_direction(direction: &'static str, bytes: u64, failed: bool) {
    metrics::counter!("relay_bytes_total", "direction" => direction).increment(bytes);
    if failed {
        metrics::counter!("relay_direction_failures_total", "direction" => direction)
            .increment(1);
    }
}

pub fn record_session_duration(duration: Duration) {
    metrics::histogram!("relay_session_duration_seconds").record(duration.as_secs_f64());
}
