//! Data surface handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::net::IpAddr;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::registry::{ServerSnapshot, ServerState, ServerSubmission};

/// `POST /submit_data`: insert or replace a backend with the given figures.
pub async fn submit_data(State(state): State<AppState>, body: Bytes) -> Response {
    let submission: ServerSubmission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected server submission");
            return (StatusCode::BAD_REQUEST, format!("Invalid server data: {e}")).into_response();
        }
    };

    let registration = state.registry.upsert(ServerState::from_injection(&submission));
    let server = registration.server.clone();
    metrics::record_backend(&server, state.slot_buffer());
    state.spawner.spawn(registration);

    tracing::info!(
        server = %server.name,
        current_users = server.current_users(),
        max_users = server.max_users(),
        accepting_connections = server.accepting_connections(state.slot_buffer()),
        "Server data submitted"
    );
    format!("Updated server {}", submission.name).into_response()
}

/// `POST /dns_ip_override`: force the source address of every lookup.
/// An empty body clears the override.
pub async fn dns_ip_override(State(state): State<AppState>, body: String) -> Response {
    let raw = body.trim();
    if raw.is_empty() {
        state.source_override.clear();
        tracing::info!("Cleared DNS IP override");
        return "Set DNS IP override to ".into_response();
    }

    match raw.parse::<IpAddr>() {
        Ok(ip) => {
            state.source_override.set(ip);
            tracing::info!(%ip, "Set DNS IP override");
            format!("Set DNS IP override to {raw}").into_response()
        }
        Err(_) => (StatusCode::BAD_REQUEST, format!("Invalid IP address: {raw}")).into_response(),
    }
}

/// `GET /servers`: every registered backend, sorted by name.
pub async fn list_servers(State(state): State<AppState>) -> Json<Vec<ServerSnapshot>> {
    let slot_buffer = state.slot_buffer();
    let mut servers: Vec<ServerSnapshot> = state
        .registry
        .snapshot()
        .iter()
        .map(|server| server.snapshot(slot_buffer))
        .collect();
    servers.sort_by(|a, b| a.name.cmp(&b.name));
    Json(servers)
}
