//! HTTP surfaces.
//!
//! # Data Flow
//! ```text
//! HTTP_DATA_PORT (data.rs)
//!     POST /submit_data      → registry upsert → poller
//!     POST /dns_ip_override  → SourceOverride set / clear
//!     GET  /servers          → registry snapshot as JSON
//!
//! HTTP_ENDPOINT_PORT (endpoint.rs)
//!     GET /                  → override → X-Real-Ip → X-Forwarded-For → peer
//!                            → SelectionEngine → backend IP as text
//! ```

pub mod data;
pub mod endpoint;
pub mod server;

pub use server::{data_router, endpoint_router, AppState, HttpServer};
