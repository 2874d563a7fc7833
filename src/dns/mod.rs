//! Authoritative DNS subsystem.
//!
//! # Data Flow
//! ```text
//! UDP/TCP query (server.rs, hickory ServerFuture)
//!     → handler.rs
//!         - non-QUERY opcode: empty reply
//!         - name outside zone: REFUSED
//!         - A hostname: source.rs (override → ECS → peer)
//!                       → SelectionEngine → A record, DNS_TTL
//!         - A http hostname: own public IPv4
//!         - SOA / NS: records.rs
//!     → AA=1, RA=0, RD=0; OPT(4096) if the query had EDNS
//! ```
//!
//! # Design Decisions
//! - One handler answers every question in the request
//! - Selection failure is SERVFAIL for that request only; the listener
//!   never stops

pub mod handler;
pub mod records;
pub mod server;
pub mod source;

pub use handler::{GeoDnsHandler, HandlerSettings};
pub use records::ZoneRecords;
pub use server::{DnsListeners, DnsServer};
pub use source::{QuerySource, SourceKind, SourceOverride};
