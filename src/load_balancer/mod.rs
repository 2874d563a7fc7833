//! Backend selection subsystem.
//!
//! # Data Flow
//! ```text
//! Lookup (DNS A query or HTTP GET /)
//!     → selection.rs: resolve source IP to a coordinate (geo)
//!     → snapshot registry, keep AcceptingConnections
//!     → Apply strategy:
//!         - nearest.rs (nearest country, then most remaining slots)
//!     → nothing eligible: configured default backend
//!     → take one slot from the chosen backend
//! ```
//!
//! # Design Decisions
//! - Strategies are pure over a candidate slice; registry access and the
//!   slot decrement live in the engine
//! - The slot decrement is best-effort and corrected by the next poll

use std::fmt::Debug;
use std::sync::Arc;

use crate::geo::GeoCoord;
use crate::registry::ServerState;

pub mod nearest;
pub mod selection;

pub use nearest::NearestCapacity;
pub use selection::{SelectionEngine, SelectionError};

/// Ranking over already-eligible backends.
pub trait LoadBalancer: Send + Sync + Debug {
    fn next_server(&self, source: GeoCoord, candidates: &[Arc<ServerState>]) -> Option<Arc<ServerState>>;
}
