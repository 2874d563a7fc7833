//! HTTP server setup.
//!
//! # Responsibilities
//! - Hold the state shared by both HTTP surfaces
//! - Build the data router (`/submit_data`, `/dns_ip_override`, `/servers`)
//! - Build the lookup router (`GET /`)
//! - Serve a router on a bound listener with peer addresses attached

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::dns::SourceOverride;
use crate::health::PollerSpawner;
use crate::http::{data, endpoint};
use crate::load_balancer::SelectionEngine;
use crate::observability::metrics::QueryRate;
use crate::registry::ServerRegistry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServerRegistry>,
    pub engine: Arc<SelectionEngine>,
    pub spawner: PollerSpawner,
    pub source_override: Arc<SourceOverride>,
    pub rate: Arc<QueryRate>,
}

impl AppState {
    pub fn slot_buffer(&self) -> i64 {
        self.engine.slot_buffer()
    }
}

/// Backend injection and operator controls.
#[allow(deprecated)]
pub fn data_router(state: AppState) -> Router {
    Router::new()
        .route("/submit_data", post(data::submit_data))
        .route("/dns_ip_override", post(data::dns_ip_override))
        .route("/servers", get(data::list_servers))
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Plain-HTTP lookup for clients that cannot use DNS.
#[allow(deprecated)]
pub fn endpoint_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(endpoint::lookup))
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// A router and the name it logs under.
pub struct HttpServer {
    name: &'static str,
    router: Router,
}

impl HttpServer {
    pub fn new(name: &'static str, router: Router) -> Self {
        Self { name, router }
    }

    /// Serve until the process exits.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(server = self.name, address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await?;

        tracing::info!(server = self.name, "HTTP server stopped");
        Ok(())
    }
}
