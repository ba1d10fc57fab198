//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): dispatched requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): dispatch latency
//! - `proxy_backend_health` (gauge): 1=healthy, 0=unhealthy, per probed URL
//! - `proxy_unit_state_transitions_total` (counter): lifecycle transitions by unit, state
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests never need to call `init_metrics`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("backend", backend.to_string()),
    ];
    counter!("proxy_requests_total", labels.clone()).increment(1);
    histogram!("proxy_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(target: &str, healthy: bool) {
    gauge!("proxy_backend_health", "backend" => target.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_unit_state(unit: &str, state: &'static str) {
    counter!(
        "proxy_unit_state_transitions_total",
        "unit" => unit.to_string(),
        "state" => state
    )
    .increment(1);
}
