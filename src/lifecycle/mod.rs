//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config + locator + public IP (public_ip.rs)
//!     → registry, selection engine, poller spawner
//!     → bind DNS (UDP+TCP), data HTTP, endpoint HTTP
//!     → spawn HTTP servers, query rate reporter, discovery
//!     → serve DNS
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Listeners are all bound before any of them serve

pub mod public_ip;
pub mod startup;

pub use startup::{Balancer, RunningBalancer};
