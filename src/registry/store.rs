//! Concurrent backend registry.
//!
//! # Responsibilities
//! - Own every known backend, keyed by name
//! - Hand each registration a cancellation signal for its poller
//! - Fire that signal on removal or replacement

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::observability::metrics;
use crate::registry::server::ServerState;

/// Registry lookup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server {0} is not registered")]
    NotFound(String),
}

/// A registered backend together with the sender that stops its poller.
#[derive(Debug)]
struct RegisteredServer {
    state: Arc<ServerState>,
    cancel: watch::Sender<bool>,
}

impl RegisteredServer {
    fn new(state: ServerState) -> (Self, Registration) {
        let state = Arc::new(state);
        let (cancel, cancelled) = watch::channel(false);
        let registration = Registration {
            server: state.clone(),
            cancelled,
        };
        (Self { state, cancel }, registration)
    }

    fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Handle returned to whoever registered a backend.
#[derive(Debug)]
pub struct Registration {
    pub server: Arc<ServerState>,
    /// Flips to `true` (or closes) when the entry leaves the registry.
    pub cancelled: watch::Receiver<bool>,
}

/// Sharded map of backend name to state.
///
/// Every operation touches at most one shard at a time; iteration copies
/// the `Arc`s out so callers never hold a shard lock while working.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: DashMap<String, RegisteredServer>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a backend unless the name is taken. `None` means it was.
    pub fn register(&self, state: ServerState) -> Option<Registration> {
        match self.servers.entry(state.name.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (entry, registration) = RegisteredServer::new(state);
                tracing::info!(server = %entry.state.name, ip = %entry.state.ip, "Server registered");
                slot.insert(entry);
                Some(registration)
            }
        }
    }

    /// Insert or replace a backend. A replaced entry's poller is cancelled.
    pub fn upsert(&self, state: ServerState) -> Registration {
        let name = state.name.clone();
        let (entry, registration) = RegisteredServer::new(state);
        if let Some(previous) = self.servers.insert(name, entry) {
            previous.cancel();
            tracing::info!(server = %registration.server.name, "Server replaced");
        }
        registration
    }

    pub fn get(&self, name: &str) -> Result<Arc<ServerState>, RegistryError> {
        self.servers
            .get(name)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// Copy of every entry, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<ServerState>> {
        self.servers.iter().map(|entry| entry.state.clone()).collect()
    }

    /// Visit a snapshot of every entry.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&Arc<ServerState>),
    {
        for server in self.snapshot() {
            visit(&server);
        }
    }

    /// Remove a backend by name and stop its poller.
    pub fn deregister(&self, name: &str) -> Option<Arc<ServerState>> {
        let (_, entry) = self.servers.remove(name)?;
        Some(self.retire(entry))
    }

    /// Remove `server` only if it is still the registered entry for its
    /// name. A poller evicting a backend that has since been replaced must
    /// not take the replacement with it.
    pub fn evict(&self, server: &Arc<ServerState>) -> bool {
        match self
            .servers
            .remove_if(&server.name, |_, entry| Arc::ptr_eq(&entry.state, server))
        {
            Some((_, entry)) => {
                self.retire(entry);
                true
            }
            None => false,
        }
    }

    fn retire(&self, entry: RegisteredServer) -> Arc<ServerState> {
        entry.cancel();
        metrics::record_backend_removed(&entry.state.name);
        tracing::info!(server = %entry.state.name, "Server deregistered");
        entry.state
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
