//! Per-backend capacity polling.
//!
//! # Responsibilities
//! - Scrape each backend's `/metrics` on a fixed interval
//! - Write the capacity gauges into the registry entry
//! - Count consecutive failures and evict at the threshold
//! - Exit when the entry's cancellation signal fires

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::BalancerConfig;
use crate::health::exposition::{CapacityReport, ExpositionError};
use crate::health::state::PollState;
use crate::observability::metrics;
use crate::registry::{Registration, ServerRegistry, ServerState};

/// Largest metrics body accepted from a backend.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Why a single scrape failed.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {0}")]
    Status(axum::http::StatusCode),

    #[error("unreadable body: {0}")]
    Body(String),

    #[error("malformed exposition: {0}")]
    Parse(#[from] ExpositionError),
}

/// Knobs shared by every poller.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub failure_threshold: u32,
    pub metrics_port: u16,
    pub slot_buffer: i64,
    pub test_mode: bool,
}

impl PollerSettings {
    pub fn from_config(config: &BalancerConfig) -> Self {
        Self {
            interval: config.polling_interval(),
            timeout: Duration::from_secs(2),
            failure_threshold: config.fsd_server_remove_failure_count,
            metrics_port: config.fsd_metrics_port,
            slot_buffer: config.fsd_slot_buffer,
            test_mode: config.test_mode,
        }
    }
}

/// One backend's polling loop.
pub struct CapacityPoller {
    server: Arc<ServerState>,
    registry: Arc<ServerRegistry>,
    client: Client<HttpConnector, Body>,
    settings: PollerSettings,
}

impl CapacityPoller {
    pub fn new(
        server: Arc<ServerState>,
        registry: Arc<ServerRegistry>,
        client: Client<HttpConnector, Body>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            server,
            registry,
            client,
            settings,
        }
    }

    /// Poll until evicted or cancelled. The first tick fires one interval
    /// after start.
    pub async fn run(self, mut cancelled: watch::Receiver<bool>) {
        tracing::debug!(
            server = %self.server.name,
            interval_secs = self.settings.interval.as_secs(),
            "Capacity poller starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.settings.interval, self.settings.interval);

        loop {
            if *cancelled.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await == PollState::Evicted {
                        break;
                    }
                }
                changed = cancelled.changed() => {
                    if changed.is_err() || *cancelled.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(server = %self.server.name, "Capacity poller exiting");
    }

    /// One poll cycle. Returns the backend's state afterwards.
    async fn tick(&self) -> PollState {
        if self.settings.test_mode {
            metrics::record_backend(&self.server, self.settings.slot_buffer);
            return self.server.poll_state(self.settings.failure_threshold);
        }

        match self.scrape().await {
            Ok(report) => {
                if !report.is_complete() {
                    tracing::debug!(server = %self.server.name, ?report, "Scrape missing capacity gauges");
                }
                self.server.apply_report(&report);
            }
            Err(e) => {
                let failures = self.server.mark_failure();
                metrics::record_poll_failure(&self.server.name);
                tracing::warn!(
                    server = %self.server.name,
                    ip = %self.server.ip,
                    failures,
                    error = %e,
                    "Capacity poll failed"
                );
            }
        }

        let state = self.server.poll_state(self.settings.failure_threshold);
        if state == PollState::Evicted {
            tracing::info!(
                server = %self.server.name,
                failures = self.server.update_failure_count(),
                "Evicting server after consecutive poll failures"
            );
            self.registry.evict(&self.server);
        } else {
            metrics::record_backend(&self.server, self.settings.slot_buffer);
        }
        state
    }

    async fn scrape(&self) -> Result<CapacityReport, PollError> {
        let uri = format!("http://{}:{}/metrics", self.server.ip, self.settings.metrics_port);
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "geo-dns-balancer")
            .body(Body::empty())
            .map_err(|e| PollError::Request(e.to_string()))?;

        // One deadline covers connect, headers and body.
        let fetch = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| PollError::Request(e.to_string()))?;

            if !response.status().is_success() {
                return Err(PollError::Status(response.status()));
            }

            axum::body::to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES)
                .await
                .map_err(|e| PollError::Body(e.to_string()))
        };
        let bytes = time::timeout(self.settings.timeout, fetch)
            .await
            .map_err(|_| PollError::Timeout(self.settings.timeout))??;

        let text = std::str::from_utf8(&bytes).map_err(|e| PollError::Body(e.to_string()))?;
        Ok(CapacityReport::parse(text)?)
    }
}

/// Starts pollers for new registrations with shared settings and client.
#[derive(Clone)]
pub struct PollerSpawner {
    registry: Arc<ServerRegistry>,
    client: Client<HttpConnector, Body>,
    settings: PollerSettings,
}

impl PollerSpawner {
    pub fn new(registry: Arc<ServerRegistry>, settings: PollerSettings) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            client,
            settings,
        }
    }

    pub fn spawn(&self, registration: Registration) -> JoinHandle<()> {
        let poller = CapacityPoller::new(
            registration.server,
            self.registry.clone(),
            self.client.clone(),
            self.settings.clone(),
        );
        tokio::spawn(poller.run(registration.cancelled))
    }
}
