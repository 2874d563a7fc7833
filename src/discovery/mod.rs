//! Backend discovery subsystem.
//!
//! # Data Flow
//! ```text
//! source.rs (CandidateSource: static list from config)
//!     → manager.rs: drop known names, exclusions, wrong prefix
//!     → probe.rs: TCP connect, expect "$DISERVER:CLIENT:VATSIM FSD"
//!     → registry register → capacity poller
//! ```
//!
//! # Design Decisions
//! - Known names are never re-probed
//! - A failed probe is retried on the next pass, not sooner

pub mod manager;
pub mod probe;
pub mod source;

pub use manager::{CandidateFilter, DiscoveryManager, DiscoveryReport};
pub use probe::{BannerProbe, ProbeError, BANNER_PREFIX};
pub use source::{Candidate, CandidateSource, SourceError, StaticSource};
