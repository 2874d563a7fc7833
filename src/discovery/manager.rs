//! Discovery refresh loop.
//!
//! # Responsibilities
//! - List candidates from a source every refresh interval
//! - Skip excluded, foreign or already-registered names
//! - Probe the rest and register the live ones
//! - Start a capacity poller for each new registration

use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::config::BalancerConfig;
use crate::discovery::probe::BannerProbe;
use crate::discovery::source::{Candidate, CandidateSource};
use crate::health::PollerSpawner;
use crate::registry::{ServerRegistry, ServerState};

/// Name rules applied before probing.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    exclude: Vec<String>,
    prefix: String,
}

impl CandidateFilter {
    pub fn new(exclude: Vec<String>, prefix: impl Into<String>) -> Self {
        Self {
            exclude,
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &BalancerConfig) -> Self {
        Self::new(config.exclusions(), config.discovery_prefix.clone())
    }

    pub fn accepts(&self, name: &str) -> bool {
        if self.exclude.iter().any(|pattern| name.contains(pattern.as_str())) {
            return false;
        }
        name.split('.').next() == Some(self.prefix.as_str())
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub registered: usize,
    pub known: usize,
    pub filtered: usize,
    pub failed_probe: usize,
}

pub struct DiscoveryManager {
    source: Arc<dyn CandidateSource>,
    registry: Arc<ServerRegistry>,
    spawner: PollerSpawner,
    probe: BannerProbe,
    filter: CandidateFilter,
    interval: Duration,
    test_mode: bool,
}

impl DiscoveryManager {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        registry: Arc<ServerRegistry>,
        spawner: PollerSpawner,
        probe: BannerProbe,
        filter: CandidateFilter,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            spawner,
            probe,
            filter,
            interval,
            test_mode: false,
        }
    }

    pub fn test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Refresh forever. The first pass runs immediately.
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Discovery starting");
        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;
            if self.test_mode {
                tracing::info!("Running in test mode, skipping discovery");
                continue;
            }
            let report = self.discover_once().await;
            tracing::debug!(?report, "Discovery pass complete");
        }
    }

    pub async fn discover_once(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let candidates = match self.source.candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Listing discovery candidates failed");
                return report;
            }
        };

        for candidate in candidates {
            if self.registry.contains(&candidate.name) {
                report.known += 1;
                continue;
            }
            if !self.filter.accepts(&candidate.name) {
                tracing::debug!(server = %candidate.name, "Candidate filtered out");
                report.filtered += 1;
                continue;
            }
            if self.admit(candidate).await {
                report.registered += 1;
            } else {
                report.failed_probe += 1;
            }
        }

        report
    }

    async fn admit(&self, candidate: Candidate) -> bool {
        tracing::info!(server = %candidate.name, ip = %candidate.ip, "Found FSD server");

        if let Err(e) = self.probe.check(candidate.ip).await {
            tracing::info!(server = %candidate.name, error = %e, "Server failed initial health check, skipping");
            return false;
        }

        match self.registry.register(ServerState::from_discovery(candidate.name.clone(), candidate.ip)) {
            Some(registration) => {
                tracing::info!(server = %candidate.name, "Server passed initial health check, starting polling");
                self.spawner.spawn(registration);
                true
            }
            // Registered by someone else while we were probing.
            None => false,
        }
    }
}
