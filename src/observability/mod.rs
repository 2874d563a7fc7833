//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pollers, selection, DNS handler, HTTP surfaces:
//!     → logging.rs (tracing events, EnvFilter + fmt)
//!     → metrics.rs (gauges and counters)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape on PROMETHEUS_METRICS_PORT
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (server, ip, source)
//! - Metric updates are fire-and-forget; no recorder means no-op

pub mod logging;
pub mod metrics;
