//! Backend poll state machine.
//!
//! # States
//! - Provisional: registered, never polled successfully
//! - Healthy: last poll succeeded
//! - Degraded: 1..N-1 consecutive failures, excluded from selection
//! - Evicted: N consecutive failures, removed from the registry
//!
//! # State Transitions
//! ```text
//! Provisional → Healthy:   poll succeeds
//! Provisional → Degraded:  poll fails
//! Healthy ⇄ Degraded:      poll fails / poll succeeds
//! Degraded → Evicted:      consecutive failures >= threshold
//! ```
//! Evicted is terminal. A backend that comes back needs a fresh
//! registration from discovery.

/// Where a backend sits in its polling lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Provisional,
    Healthy,
    Degraded,
    Evicted,
}

impl PollState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollState::Provisional => "provisional",
            PollState::Healthy => "healthy",
            PollState::Degraded => "degraded",
            PollState::Evicted => "evicted",
        }
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
