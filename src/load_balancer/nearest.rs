//! Nearest-country, most-capacity strategy.

use std::sync::Arc;

use crate::geo::{distance_miles, GeoCoord};
use crate::load_balancer::LoadBalancer;
use crate::registry::ServerState;

/// Picks the backend with the most remaining slots among those in the same
/// country as the nearest backend.
///
/// Ties on slots keep distance order, so the closer of two equally loaded
/// backends wins.
#[derive(Debug, Default)]
pub struct NearestCapacity;

impl NearestCapacity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for NearestCapacity {
    fn next_server(&self, source: GeoCoord, candidates: &[Arc<ServerState>]) -> Option<Arc<ServerState>> {
        let mut by_distance: Vec<(f64, &Arc<ServerState>)> = candidates
            .iter()
            .map(|server| (distance_miles(source, server.location), server))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (_, nearest) = *by_distance.first()?;
        let target_country = nearest.country.as_str();

        // Slots are read once; concurrent queries keep taking them.
        let mut same_country: Vec<(i64, &Arc<ServerState>)> = by_distance
            .iter()
            .map(|(_, server)| *server)
            .filter(|server| server.country == target_country)
            .map(|server| (server.remaining_slots(), server))
            .collect();
        same_country.sort_by(|a, b| b.0.cmp(&a.0));

        match same_country.first() {
            Some((_, best)) => Some(Arc::clone(best)),
            None => {
                tracing::warn!(server = %nearest.name, "No server in nearest country, returning nearest");
                Some(Arc::clone(nearest))
            }
        }
    }
}
