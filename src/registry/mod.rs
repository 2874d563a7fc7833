//! Backend registry subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery (probe passed)        Data surface (/submit_data)
//!     → ServerState::from_discovery    → ServerState::from_injection
//!     → store.rs register              → store.rs upsert
//!             ↓                                ↓
//!        Registration { server, cancelled }
//!             → capacity poller (health/poller.rs)
//!
//! Selection and reporting read via snapshot(); pollers evict via evict().
//! ```
//!
//! # Design Decisions
//! - Sharded map, never a registry-wide lock
//! - Entries are Arc'd with atomic fields; field updates skip the map
//! - Removal always fires the entry's cancellation signal

pub mod server;
pub mod store;

pub use server::{ServerSnapshot, ServerState, ServerSubmission};
pub use store::{Registration, RegistryError, ServerRegistry};
