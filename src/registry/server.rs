//! Backend server state.
//!
//! # Responsibilities
//! - Represent a single FSD backend
//! - Hold capacity figures written by its poller
//! - Derive eligibility for selection
//! - Track consecutive poll failures

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use crate::geo::locations::{country_code, location_for};
use crate::geo::GeoCoord;
use crate::health::exposition::CapacityReport;
use crate::health::state::PollState;

/// Backend figures submitted through the data surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSubmission {
    pub name: String,
    pub ip_address: Ipv4Addr,
    #[serde(default)]
    pub current_users: i64,
    #[serde(default)]
    pub max_users: i64,
    #[serde(default)]
    pub remaining_slots: i64,
}

/// A single backend server.
///
/// Identity and location are fixed at construction. Capacity fields are
/// atomics so pollers and query tasks update them without locking the
/// registry.
#[derive(Debug)]
pub struct ServerState {
    pub name: String,
    pub ip: Ipv4Addr,
    pub country: String,
    pub location: GeoCoord,

    current_users: AtomicI64,
    max_users: AtomicI64,
    remaining_slots: AtomicI64,
    able_to_update: AtomicBool,
    update_failure_count: AtomicU32,
}

impl ServerState {
    fn with_capacity(name: String, ip: Ipv4Addr, current: i64, max: i64, remaining: i64, able: bool) -> Self {
        let country = country_code(&name);
        let location = location_for(&country).unwrap_or_else(|| {
            tracing::warn!(server = %name, country = %country, "No location for country code");
            GeoCoord::new(0.0, 0.0)
        });

        Self {
            name,
            ip,
            country,
            location,
            current_users: AtomicI64::new(current),
            max_users: AtomicI64::new(max),
            remaining_slots: AtomicI64::new(remaining),
            able_to_update: AtomicBool::new(able),
            update_failure_count: AtomicU32::new(0),
        }
    }

    /// A freshly discovered backend. Not selectable until its first
    /// successful poll.
    pub fn from_discovery(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self::with_capacity(name.into(), ip, 0, 0, 0, false)
    }

    /// A backend injected through the data surface, taken at its word.
    pub fn from_injection(submission: &ServerSubmission) -> Self {
        Self::with_capacity(
            submission.name.clone(),
            submission.ip_address,
            submission.current_users,
            submission.max_users,
            submission.remaining_slots,
            true,
        )
    }

    /// Replace the name-derived location.
    pub fn with_location(mut self, location: GeoCoord) -> Self {
        self.location = location;
        self
    }

    pub fn current_users(&self) -> i64 {
        self.current_users.load(Ordering::Relaxed)
    }

    pub fn max_users(&self) -> i64 {
        self.max_users.load(Ordering::Relaxed)
    }

    pub fn remaining_slots(&self) -> i64 {
        self.remaining_slots.load(Ordering::Relaxed)
    }

    pub fn able_to_update(&self) -> bool {
        self.able_to_update.load(Ordering::Relaxed)
    }

    pub fn update_failure_count(&self) -> u32 {
        self.update_failure_count.load(Ordering::Relaxed)
    }

    /// Whether the backend may be handed out.
    pub fn accepting_connections(&self, slot_buffer: i64) -> bool {
        self.max_users() > 0 && self.able_to_update() && self.remaining_slots() >= slot_buffer
    }

    /// Lifecycle position given the eviction threshold.
    pub fn poll_state(&self, failure_threshold: u32) -> PollState {
        let failures = self.update_failure_count();
        if failures >= failure_threshold {
            PollState::Evicted
        } else if failures > 0 {
            PollState::Degraded
        } else if self.able_to_update() {
            PollState::Healthy
        } else {
            PollState::Provisional
        }
    }

    // --- Poller writes ---

    /// Write the figures present in a scrape and mark the backend healthy.
    pub fn apply_report(&self, report: &CapacityReport) {
        if let Some(max) = report.max_users {
            self.max_users.store(max, Ordering::Relaxed);
        }
        if let Some(current) = report.current_users {
            self.current_users.store(current, Ordering::Relaxed);
        }
        if let Some(remaining) = report.remaining_slots {
            self.remaining_slots.store(remaining, Ordering::Relaxed);
        }
        self.able_to_update.store(true, Ordering::Relaxed);
        self.update_failure_count.store(0, Ordering::Relaxed);
    }

    /// Record a failed scrape. Returns the new consecutive failure count.
    pub fn mark_failure(&self) -> u32 {
        self.able_to_update.store(false, Ordering::Relaxed);
        self.update_failure_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    // --- Selection writes ---

    /// Count one client as sent to this backend.
    pub fn take_slot(&self) {
        // Unsynchronised: concurrent picks may lose a decrement until the
        // next poll overwrites the figure.
        let remaining = self.remaining_slots.load(Ordering::Relaxed);
        self.remaining_slots.store(remaining - 1, Ordering::Relaxed);
    }

    /// Point-in-time copy for reporting.
    pub fn snapshot(&self, slot_buffer: i64) -> ServerSnapshot {
        ServerSnapshot {
            name: self.name.clone(),
            ip_address: self.ip,
            country: self.country.clone(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            current_users: self.current_users(),
            max_users: self.max_users(),
            remaining_slots: self.remaining_slots(),
            able_to_update: self.able_to_update(),
            update_failure_count: self.update_failure_count(),
            accepting_connections: self.accepting_connections(slot_buffer),
        }
    }
}

/// Serializable view of a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub name: String,
    pub ip_address: Ipv4Addr,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_users: i64,
    pub max_users: i64,
    pub remaining_slots: i64,
    pub able_to_update: bool,
    pub update_failure_count: u32,
    pub accepting_connections: bool,
}
