//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_proto::xfer::Protocol;
use hickory_server::authority::{MessageRequest, MessageResponse};
use hickory_server::server::{Request, ResponseHandler, ResponseInfo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use geo_dns_balancer::geo::{GeoCoord, GeoError, GeoLocator};
use geo_dns_balancer::registry::{ServerState, ServerSubmission};

// --- Places ---

pub const LONDON: GeoCoord = GeoCoord::new(51.5072, -0.1276);
pub const NEW_YORK: GeoCoord = GeoCoord::new(40.7128, -74.0060);
pub const FRANKFURT: GeoCoord = GeoCoord::new(50.1109, 8.6821);

pub const LONDON_CLIENT: &str = "81.2.69.160";
pub const NEW_YORK_CLIENT: &str = "216.160.83.56";
pub const FRANKFURT_CLIENT: &str = "89.160.20.112";

// --- Mock backends ---

/// Start a mock HTTP backend on an ephemeral port. `f` decides each
/// response's status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Mock backend serving a fixed metrics exposition.
pub async fn start_metrics_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Exposition as an FSD server would publish it.
pub fn exposition(max: i64, current: i64, remaining: i64) -> String {
    format!(
        "# TYPE fsd_maxclients gauge\nfsd_maxclients {max}\n\
         # TYPE interface_client_current gauge\ninterface_client_current{{interface=\"fsd\"}} {current}\n\
         # TYPE fsd_remainingslots gauge\nfsd_remainingslots {remaining}\n"
    )
}

/// Mock client port that greets each connection with `banner`.
pub async fn start_banner_server(banner: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(banner.as_bytes()).await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            });
        }
    });

    addr
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

// --- Geolocation ---

/// Locator answering from a fixed table.
#[derive(Debug, Default)]
pub struct FixedLocator {
    places: HashMap<IpAddr, GeoCoord>,
}

impl FixedLocator {
    pub fn new() -> Self {
        Self::default()
            .with(LONDON_CLIENT, LONDON)
            .with(NEW_YORK_CLIENT, NEW_YORK)
            .with(FRANKFURT_CLIENT, FRANKFURT)
    }

    pub fn with(mut self, ip: &str, coord: GeoCoord) -> Self {
        self.places.insert(ip.parse().unwrap(), coord);
        self
    }
}

impl GeoLocator for FixedLocator {
    fn locate(&self, ip: IpAddr) -> Result<GeoCoord, GeoError> {
        self.places.get(&ip).copied().ok_or(GeoError::NotFound(ip))
    }
}

// --- Backends ---

pub fn submission(name: &str, ip: Ipv4Addr, max: i64, remaining: i64) -> ServerSubmission {
    ServerSubmission {
        name: name.to_string(),
        ip_address: ip,
        current_users: max - remaining,
        max_users: max,
        remaining_slots: remaining,
    }
}

pub fn injected(name: &str, ip: Ipv4Addr, max: i64, remaining: i64) -> ServerState {
    ServerState::from_injection(&submission(name, ip, max, remaining))
}

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

// --- Query construction ---

/// Wire-format query, optionally carrying EDNS with a client subnet.
pub fn build_query_message(
    name: &str,
    record_type: RecordType,
    op_code: OpCode,
    edns: Option<Option<IpAddr>>,
) -> Message {
    let mut msg = Message::new();
    msg.set_id(4242);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(op_code);
    msg.set_recursion_desired(true);

    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);

    if let Some(subnet) = edns {
        let mut edns = Edns::new();
        edns.set_max_payload(1232);
        if let Some(addr) = subnet {
            // Full-length prefix so the address survives the wire encoding.
            let prefix = if addr.is_ipv4() { 32 } else { 128 };
            edns.options_mut()
                .insert(EdnsOption::Subnet(ClientSubnet::new(addr, prefix, 0)));
        }
        msg.set_edns(edns);
    }

    msg
}

pub fn build_request(name: &str, record_type: RecordType, src: SocketAddr) -> Request {
    build_request_with(name, record_type, OpCode::Query, None, src)
}

pub fn build_request_with(
    name: &str,
    record_type: RecordType,
    op_code: OpCode,
    edns: Option<Option<IpAddr>>,
    src: SocketAddr,
) -> Request {
    into_request(build_query_message(name, record_type, op_code, edns), src)
}

/// A-query carrying a client subnet with an explicit source prefix.
pub fn build_subnet_request(name: &str, subnet: IpAddr, prefix: u8, src: SocketAddr) -> Request {
    let mut msg = build_query_message(name, RecordType::A, OpCode::Query, None);
    let mut edns = Edns::new();
    edns.set_max_payload(1232);
    edns.options_mut()
        .insert(EdnsOption::Subnet(ClientSubnet::new(subnet, prefix, 0)));
    msg.set_edns(edns);
    into_request(msg, src)
}

fn into_request(msg: Message, src: SocketAddr) -> Request {
    let bytes = msg.to_vec().unwrap();
    let mut decoder = BinDecoder::new(&bytes);
    let msg = MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest");
    Request::new(msg, src, Protocol::Udp)
}

pub fn src(ip: &str) -> SocketAddr {
    SocketAddr::new(ip.parse().unwrap(), 53535)
}

/// A addresses in a response's answer section.
pub fn a_answers(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(a.0),
            _ => None,
        })
        .collect()
}
