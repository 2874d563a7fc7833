//! Capacity polling subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (discovery or /submit_data)
//!     → poller.rs: one task per backend, fixed interval
//!     → GET http://<ip>:<metrics_port>/metrics
//!     → exposition.rs: pull fsd_maxclients, interface_client_current,
//!       fsd_remainingslots
//!     → ServerState::apply_report / mark_failure
//!
//! State machine (state.rs):
//!     Provisional → Healthy ⇄ Degraded → Evicted
//! ```
//!
//! # Design Decisions
//! - A worker per backend, not one sweep over all of them
//! - Consecutive failures only; one success resets the count
//! - Eviction is terminal; discovery re-admits with a new entry

pub mod exposition;
pub mod poller;
pub mod state;

pub use exposition::{CapacityReport, ExpositionError};
pub use poller::{CapacityPoller, PollError, PollerSettings, PollerSpawner};
pub use state::PollState;
