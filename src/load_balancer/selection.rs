//! Selection engine: registry snapshot, eligibility, strategy, fallback.

use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::geo::{GeoCoord, GeoLocator};
use crate::load_balancer::{LoadBalancer, NearestCapacity};
use crate::registry::{ServerRegistry, ServerState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Nothing is eligible and the configured default is not registered.
    #[error("no eligible server and default server {0:?} is not registered")]
    DefaultMissing(String),
}

/// Chooses a backend for a lookup.
#[derive(Debug)]
pub struct SelectionEngine {
    registry: Arc<ServerRegistry>,
    locator: Arc<dyn GeoLocator>,
    strategy: Box<dyn LoadBalancer>,
    default_server: String,
    slot_buffer: i64,
}

impl SelectionEngine {
    pub fn new(
        registry: Arc<ServerRegistry>,
        locator: Arc<dyn GeoLocator>,
        default_server: impl Into<String>,
        slot_buffer: i64,
    ) -> Self {
        Self {
            registry,
            locator,
            strategy: Box::new(NearestCapacity::new()),
            default_server: default_server.into(),
            slot_buffer,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn LoadBalancer>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn slot_buffer(&self) -> i64 {
        self.slot_buffer
    }

    /// Pick for a coordinate and take one slot from the result.
    pub fn pick_server(&self, source: GeoCoord) -> Result<Arc<ServerState>, SelectionError> {
        let eligible: Vec<Arc<ServerState>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|server| server.accepting_connections(self.slot_buffer))
            .collect();

        let server = match self.strategy.next_server(source, &eligible) {
            Some(server) => server,
            None => {
                tracing::error!(
                    default = %self.default_server,
                    "No servers possible for a request, using default FSD server"
                );
                self.default()?
            }
        };

        server.take_slot();
        Ok(server)
    }

    /// Geolocate `ip` and pick. An address the database cannot place gets
    /// the default backend.
    pub fn pick_for_ip(&self, ip: IpAddr) -> Result<Arc<ServerState>, SelectionError> {
        let ip = unmap(ip);
        match self.locator.locate(ip) {
            Ok(coord) => self.pick_server(coord),
            Err(e) => {
                tracing::warn!(%ip, error = %e, "Geo lookup failed, using default FSD server");
                let server = self.default()?;
                server.take_slot();
                Ok(server)
            }
        }
    }

    fn default(&self) -> Result<Arc<ServerState>, SelectionError> {
        self.registry
            .get(&self.default_server)
            .map_err(|_| SelectionError::DefaultMissing(self.default_server.clone()))
    }
}

/// Treat IPv4-mapped IPv6 addresses as plain IPv4.
fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoError;
    use crate::registry::ServerSubmission;
    use std::net::Ipv4Addr;

    const LONDON: GeoCoord = GeoCoord::new(51.5072, -0.1276);

    #[derive(Debug)]
    struct NowhereLocator;

    impl GeoLocator for NowhereLocator {
        fn locate(&self, ip: IpAddr) -> Result<GeoCoord, GeoError> {
            Err(GeoError::NotFound(ip))
        }
    }

    fn submission(name: &str, max: i64, remaining: i64) -> ServerSubmission {
        ServerSubmission {
            name: name.into(),
            ip_address: Ipv4Addr::new(192, 0, 2, 1),
            current_users: 0,
            max_users: max,
            remaining_slots: remaining,
        }
    }

    /// Fills the busiest backend first, ignoring distance.
    #[derive(Debug)]
    struct FewestSlots;

    impl LoadBalancer for FewestSlots {
        fn next_server(&self, _: GeoCoord, candidates: &[Arc<ServerState>]) -> Option<Arc<ServerState>> {
            candidates.iter().min_by_key(|server| server.remaining_slots()).cloned()
        }
    }

    fn engine(registry: Arc<ServerRegistry>) -> SelectionEngine {
        SelectionEngine::new(registry, Arc::new(NowhereLocator), "fsd.usa-e1.vatsim.net", 0)
    }

    #[test]
    fn test_pick_decrements_by_one() {
        let registry = Arc::new(ServerRegistry::new());
        registry.upsert(ServerState::from_injection(&submission("fsd.uk1.vatsim.net", 100, 10)));

        let picked = engine(registry).pick_server(LONDON).unwrap();
        assert_eq!(picked.remaining_slots(), 9);
    }

    #[test]
    fn test_ineligible_never_returned_when_eligible_exists() {
        let registry = Arc::new(ServerRegistry::new());
        registry.upsert(ServerState::from_injection(&submission("fsd.uk1.vatsim.net", 0, 500)));
        registry.upsert(ServerState::from_injection(&submission("fsd.usa-e1.vatsim.net", 100, 5)));

        let picked = engine(registry).pick_server(LONDON).unwrap();
        assert_eq!(picked.name, "fsd.usa-e1.vatsim.net");
    }

    #[test]
    fn test_custom_strategy_still_filters_and_takes_slot() {
        let registry = Arc::new(ServerRegistry::new());
        registry.upsert(ServerState::from_injection(&submission("fsd.ams1.vatsim.net", 0, 500)));
        registry.upsert(ServerState::from_injection(&submission("fsd.uk1.vatsim.net", 100, 10)));
        registry.upsert(ServerState::from_injection(&submission("fsd.usa-e1.vatsim.net", 100, 5)));

        let engine = engine(registry).with_strategy(Box::new(FewestSlots));
        let picked = engine.pick_server(LONDON).unwrap();
        assert_eq!(picked.name, "fsd.usa-e1.vatsim.net");
        assert_eq!(picked.remaining_slots(), 4);
    }

    #[test]
    fn test_default_missing() {
        let engine = engine(Arc::new(ServerRegistry::new()));
        assert_eq!(
            engine.pick_server(LONDON).unwrap_err(),
            SelectionError::DefaultMissing("fsd.usa-e1.vatsim.net".into())
        );
    }

    #[test]
    fn test_geo_miss_uses_default() {
        let registry = Arc::new(ServerRegistry::new());
        registry.upsert(ServerState::from_injection(&submission("fsd.uk1.vatsim.net", 100, 10)));
        registry.upsert(ServerState::from_injection(&submission("fsd.usa-e1.vatsim.net", 100, 10)));

        let picked = engine(registry).pick_for_ip("203.0.113.7".parse().unwrap()).unwrap();
        assert_eq!(picked.name, "fsd.usa-e1.vatsim.net");
        assert_eq!(picked.remaining_slots(), 9);
    }
}
