//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fstab_requests_total` (counter): requests by target kind and status
//! - `fstab_request_duration_seconds` (histogram): dispatch latency
//! - `fstab_reloads_total` (counter): reload attempts by outcome
//! - `fstab_mounts` (gauge): bound mount points in the live table
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(target: &'static str, status: u16, start: Instant) {
    counter!("fstab_requests_total", "target" => target, "status" => status.to_string())
        .increment(1);
    histogram!("fstab_request_duration_seconds", "target" => target)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    counter!("fstab_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_mounted(count: usize) {
    gauge!("fstab_mounts").set(count as f64);
}
