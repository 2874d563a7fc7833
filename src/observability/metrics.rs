//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vatdns_current_users` (gauge, `server`): connected clients
//! - `vatdns_max_users` (gauge, `server`): client capacity
//! - `vatdns_remaining_slots` (gauge, `server`): free slots as last seen
//! - `vatdns_accepting_connections` (gauge, `server`): 1 if selectable
//! - `vatdns_requests_per_second` (gauge): lookups answered in the last second
//! - `vatdns_dns_queries_total` (counter, `type`): questions by record type
//! - `vatdns_poll_failures_total` (counter, `server`): failed capacity scrapes
//!
//! # Design Decisions
//! - Per-backend gauges are rewritten every poll tick. The exporter drops
//!   gauges idle for longer than the configured timeout, which is how a
//!   deregistered backend's series disappear.
//! - The query rate is a plain atomic counter swapped out once a second.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use metrics_util::MetricKindMask;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::registry::ServerState;

/// Install the global recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr, idle_timeout: Duration) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .idle_timeout(MetricKindMask::GAUGE, Some(idle_timeout))
        .install()?;

    tracing::info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Publish one backend's current figures.
pub fn record_backend(server: &ServerState, slot_buffer: i64) {
    let name = server.name.clone();
    metrics::gauge!("vatdns_current_users", "server" => name.clone()).set(server.current_users() as f64);
    metrics::gauge!("vatdns_max_users", "server" => name.clone()).set(server.max_users() as f64);
    metrics::gauge!("vatdns_remaining_slots", "server" => name.clone())
        .set(server.remaining_slots() as f64);
    metrics::gauge!("vatdns_accepting_connections", "server" => name)
        .set(if server.accepting_connections(slot_buffer) { 1.0 } else { 0.0 });
}

/// Zero a removed backend's selectability until the exporter expires it.
pub fn record_backend_removed(name: &str) {
    metrics::gauge!("vatdns_accepting_connections", "server" => name.to_string()).set(0.0);
}

pub fn record_query(record_type: &str) {
    metrics::counter!("vatdns_dns_queries_total", "type" => record_type.to_string()).increment(1);
}

pub fn record_poll_failure(name: &str) {
    metrics::counter!("vatdns_poll_failures_total", "server" => name.to_string()).increment(1);
}

/// Lookups answered since the last report.
#[derive(Debug, Default)]
pub struct QueryRate {
    count: AtomicU64,
}

impl QueryRate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset the counter.
    pub fn take(&self) -> u64 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Publish the rate once a second, forever.
    pub async fn report(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let rate = self.take();
            metrics::gauge!("vatdns_requests_per_second").set(rate as f64);
            if rate > 0 {
                tracing::debug!(rate, "Requests per second");
            }
        }
    }
}
