//! Geo-aware DNS load balancer for FSD backends.
//!
//! Answers A queries for one hostname with the backend nearest the
//! querying client that still has capacity, preferring the backend with
//! the most free slots among those in the nearest backend's country.

// Core subsystems
pub mod config;
pub mod dns;
pub mod geo;
pub mod http;
pub mod registry;

// Backend management
pub mod discovery;
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::BalancerConfig;
pub use error::BalancerError;
pub use lifecycle::{Balancer, RunningBalancer};
