//! Data surface and HTTP lookup endpoint.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use hickory_proto::rr::RecordType;
use hickory_server::server::RequestHandler;
use tower::ServiceExt;

use geo_dns_balancer::dns::{GeoDnsHandler, HandlerSettings, SourceOverride, ZoneRecords};
use geo_dns_balancer::health::{PollerSettings, PollerSpawner};
use geo_dns_balancer::http::{data_router, endpoint_router, AppState};
use geo_dns_balancer::load_balancer::SelectionEngine;
use geo_dns_balancer::observability::metrics::QueryRate;
use geo_dns_balancer::registry::{ServerRegistry, ServerSnapshot};

mod common;

const DEFAULT: &str = "fsd.usa-e9.vatsim.net";

fn state() -> AppState {
    let registry = Arc::new(ServerRegistry::new());
    let engine = Arc::new(SelectionEngine::new(
        registry.clone(),
        Arc::new(common::FixedLocator::new()),
        DEFAULT,
        0,
    ));
    let spawner = PollerSpawner::new(
        registry.clone(),
        PollerSettings {
            interval: Duration::from_secs(3600),
            timeout: Duration::from_millis(200),
            failure_threshold: 3,
            metrics_port: 9,
            slot_buffer: 0,
            test_mode: true,
        },
    );
    AppState {
        registry,
        engine,
        spawner,
        source_override: Arc::new(SourceOverride::new()),
        rate: Arc::new(QueryRate::new()),
    }
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

fn lookup_from(peer: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri("/");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .extension(ConnectInfo(SocketAddr::new(peer.parse().unwrap(), 40000)))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn submit(router: &Router, name: &str, ip: Ipv4Addr, max: i64, remaining: i64) -> (StatusCode, String) {
    let body = serde_json::to_string(&common::submission(name, ip, max, remaining)).unwrap();
    send(router, post("/submit_data", body)).await
}

#[tokio::test]
async fn test_submit_then_resolve_over_dns() {
    let state = state();
    let router = data_router(state.clone());

    let (status, body) = submit(&router, "fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 3), 100, 40).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Updated server fsd.uk1.vatsim.net");

    let handler = GeoDnsHandler::new(
        state.engine.clone(),
        ZoneRecords::new(
            "connect.vatsim.net",
            &["ns1.vatsim.net".to_string(), "ns2.vatsim.net".to_string()],
        )
        .unwrap(),
        HandlerSettings::new("fsd.connect.vatsim.net", "fsd-http.connect.vatsim.net", 10, None).unwrap(),
        state.source_override.clone(),
        state.rate.clone(),
    );
    let request = common::build_request(
        "fsd.connect.vatsim.net",
        RecordType::A,
        common::src(common::LONDON_CLIENT),
    );
    let response = common::TestResponseHandler::new();
    handler.handle_request(&request, response.clone()).await;

    assert_eq!(
        common::a_answers(&response.into_message()),
        vec![Ipv4Addr::new(192, 0, 2, 3)]
    );
}

#[tokio::test]
async fn test_resubmit_replaces_figures() {
    let state = state();
    let router = data_router(state.clone());

    submit(&router, "fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 3), 100, 40).await;
    submit(&router, "fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 4), 100, 0).await;

    let server = state.registry.get("fsd.uk1.vatsim.net").unwrap();
    assert_eq!(state.registry.len(), 1);
    assert_eq!(server.ip, Ipv4Addr::new(192, 0, 2, 4));
    assert!(!server.accepting_connections(0));
}

#[tokio::test]
async fn test_invalid_submission_rejected() {
    let state = state();
    let router = data_router(state.clone());

    let (status, _) = send(&router, post("/submit_data", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        post("/submit_data", r#"{"name":"fsd.uk1.vatsim.net","ip_address":"not-an-ip"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_override_set_and_clear() {
    let state = state();
    let router = data_router(state.clone());

    let (status, body) = send(&router, post("/dns_ip_override", "89.160.20.112")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Set DNS IP override to 89.160.20.112");
    assert_eq!(state.source_override.get(), Some("89.160.20.112".parse().unwrap()));

    let (status, body) = send(&router, post("/dns_ip_override", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Set DNS IP override to ");
    assert_eq!(state.source_override.get(), None);
}

#[tokio::test]
async fn test_override_rejects_garbage() {
    let state = state();
    state.source_override.set("89.160.20.112".parse().unwrap());
    let router = data_router(state.clone());

    let (status, _) = send(&router, post("/dns_ip_override", "not-an-ip")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.source_override.get(), Some("89.160.20.112".parse().unwrap()));
}

#[tokio::test]
async fn test_servers_listed_by_name() {
    let state = state();
    let router = data_router(state.clone());
    submit(&router, "fsd.usa-e1.vatsim.net", Ipv4Addr::new(192, 0, 2, 1), 100, 10).await;
    submit(&router, "fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 3), 100, 20).await;

    let request = Request::builder().uri("/servers").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);

    let servers: Vec<ServerSnapshot> = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["fsd.uk1.vatsim.net", "fsd.usa-e1.vatsim.net"]);
    assert_eq!(servers[0].country, "uk");
    assert_eq!(servers[0].remaining_slots, 20);
    assert!(servers[0].accepting_connections);
}

#[tokio::test]
async fn test_lookup_uses_peer_address() {
    let state = state();
    state
        .registry
        .upsert(common::injected("fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 3), 100, 10));
    state
        .registry
        .upsert(common::injected("fsd.usa-e1.vatsim.net", Ipv4Addr::new(192, 0, 2, 1), 100, 10));
    let router = endpoint_router(state.clone());

    let (status, body) = send(&router, lookup_from(common::NEW_YORK_CLIENT, &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "192.0.2.1");
    assert_eq!(state.rate.take(), 1);
}

#[tokio::test]
async fn test_lookup_header_precedence() {
    let state = state();
    state
        .registry
        .upsert(common::injected("fsd.uk1.vatsim.net", Ipv4Addr::new(192, 0, 2, 3), 100, 10));
    state
        .registry
        .upsert(common::injected("fsd.usa-e1.vatsim.net", Ipv4Addr::new(192, 0, 2, 1), 100, 10));
    state
        .registry
        .upsert(common::injected("fsd.ger1.vatsim.net", Ipv4Addr::new(192, 0, 2, 5), 100, 10));
    let router = endpoint_router(state.clone());

    // Forwarding headers beat the peer.
    let (_, body) = send(
        &router,
        lookup_from(
            common::NEW_YORK_CLIENT,
            &[("x-forwarded-for", "81.2.69.160, 10.0.0.1")],
        ),
    )
    .await;
    assert_eq!(body, "192.0.2.3");

    // X-Real-Ip beats X-Forwarded-For.
    let (_, body) = send(
        &router,
        lookup_from(
            common::NEW_YORK_CLIENT,
            &[("x-real-ip", common::FRANKFURT_CLIENT), ("x-forwarded-for", "81.2.69.160")],
        ),
    )
    .await;
    assert_eq!(body, "192.0.2.5");

    // The operator override beats both.
    state.source_override.set(common::NEW_YORK_CLIENT.parse().unwrap());
    let (_, body) = send(
        &router,
        lookup_from(common::LONDON_CLIENT, &[("x-real-ip", common::FRANKFURT_CLIENT)]),
    )
    .await;
    assert_eq!(body, "192.0.2.1");
}

#[tokio::test]
async fn test_lookup_without_default_is_unavailable() {
    let state = state();
    let router = endpoint_router(state);

    let (status, _) = send(&router, lookup_from(common::LONDON_CLIENT, &[])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
