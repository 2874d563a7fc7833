//! Plain-HTTP lookup: the same selection as the DNS hostname, answered
//! as the backend's IP in a text body.

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};

use crate::dns::{QuerySource, SourceKind};
use crate::http::server::AppState;

/// Client address from proxy headers: `X-Real-Ip`, then the first
/// `X-Forwarded-For` entry. Unparseable values are ignored.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
}

/// `GET /`
pub async fn lookup(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    state.rate.increment();

    let source = QuerySource::resolve(
        state.source_override.get(),
        forwarded_ip(&headers).map(|ip| (ip, SourceKind::Header)),
        peer.ip(),
    );

    match state.engine.pick_for_ip(source.ip) {
        Ok(server) => {
            tracing::info!(ip = %source.ip, source = %source.kind, served = %server.name, "HTTP lookup served");
            server.ip.to_string().into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "No server to answer with");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}
