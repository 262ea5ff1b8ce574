//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_events_forwarded_total` (counter): events accepted downstream
//! - `relay_event_errors_total` (counter): failed submissions by `reason`
//! - `relay_forward_duration_seconds` (histogram): forward latency by `outcome`
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_forwarded() {
    counter!("relay_events_forwarded_total").increment(1);
}

/// `reason` is one of `form`, `request`, `transport`, `cancelled`,
/// `rejected`, `abandoned`.
pub fn record_error(reason: &'static str) {
    counter!("relay_event_errors_total", "reason" => reason).increment(1);
}

pub fn record_forward_duration(elapsed: Duration, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    histogram!("relay_forward_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}
