//! Authoritative request handler for the balancer's zone.

use hickory_proto::op::{Edns, Header, OpCode, ResponseCode};
use hickory_proto::rr::{LowerName, Name, Record, RecordType};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::dns::records::{a_record, fqdn, ZoneRecords};
use crate::dns::source::{client_subnet, QuerySource, SourceKind, SourceOverride};
use crate::load_balancer::{SelectionEngine, SelectionError};
use crate::observability::metrics::{self, QueryRate};

/// Payload size advertised in response OPT records.
const EDNS_MAX_PAYLOAD: u16 = 4096;

/// Static handler settings.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub hostname: Name,
    pub http_hostname: Name,
    pub ttl: u32,
    pub public_ip: Option<Ipv4Addr>,
}

impl HandlerSettings {
    pub fn new(
        hostname: &str,
        http_hostname: &str,
        ttl: u32,
        public_ip: Option<Ipv4Addr>,
    ) -> Result<Self, hickory_proto::ProtoError> {
        Ok(Self {
            hostname: fqdn(hostname)?,
            http_hostname: fqdn(http_hostname)?,
            ttl,
            public_ip,
        })
    }
}

/// Answers A, SOA and NS questions for the zone.
pub struct GeoDnsHandler {
    engine: Arc<SelectionEngine>,
    zone: ZoneRecords,
    hostname: LowerName,
    http_hostname: LowerName,
    ttl: u32,
    public_ip: Option<Ipv4Addr>,
    source_override: Arc<SourceOverride>,
    rate: Arc<QueryRate>,
}

/// Answers gathered for one request.
struct Answers {
    records: Vec<Record>,
    code: ResponseCode,
}

impl GeoDnsHandler {
    pub fn new(
        engine: Arc<SelectionEngine>,
        zone: ZoneRecords,
        settings: HandlerSettings,
        source_override: Arc<SourceOverride>,
        rate: Arc<QueryRate>,
    ) -> Self {
        Self {
            engine,
            zone,
            hostname: LowerName::from(settings.hostname),
            http_hostname: LowerName::from(settings.http_hostname),
            ttl: settings.ttl,
            public_ip: settings.public_ip,
            source_override,
            rate,
        }
    }

    fn answer(&self, request: &Request) -> Answers {
        let mut answers = Answers {
            records: Vec::new(),
            code: ResponseCode::NoError,
        };

        for query in request.queries().iter() {
            let name = query.name();
            let query_type = query.query_type();
            metrics::record_query(&query_type.to_string());

            if !self.zone.contains(name) {
                tracing::debug!(%name, %query_type, "Query outside zone");
                answers.code = ResponseCode::Refused;
                continue;
            }

            match query_type {
                RecordType::A if *name == self.hostname => match self.pick(request) {
                    Ok((source, server_name, ip)) => {
                        tracing::info!(
                            ip = %source.ip,
                            source = %source.kind,
                            served = %server_name,
                            "DNS lookup served"
                        );
                        answers.records.push(a_record(Name::from(name.clone()), self.ttl, ip));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "No server to answer with");
                        answers.code = ResponseCode::ServFail;
                    }
                },
                RecordType::A if *name == self.http_hostname => {
                    if let Some(ip) = self.public_ip {
                        answers.records.push(a_record(Name::from(name.clone()), self.ttl, ip));
                    }
                }
                RecordType::SOA => {
                    tracing::info!("Served SOA record request");
                    answers.records.push(self.zone.soa().clone());
                }
                RecordType::NS => {
                    tracing::info!("Served NS record request");
                    answers.records.extend(self.zone.ns().iter().cloned());
                }
                _ => {}
            }
        }

        answers
    }

    fn pick(&self, request: &Request) -> Result<(QuerySource, String, Ipv4Addr), SelectionError> {
        let subnet = client_subnet(request.edns());
        if let Some(ip) = subnet {
            tracing::info!(subnet = %ip, "EDNS client subnet found");
        }

        let source = QuerySource::resolve(
            self.source_override.get(),
            subnet.map(|ip| (ip, SourceKind::ClientSubnet)),
            request.src().ip(),
        );
        let server = self.engine.pick_for_ip(source.ip)?;
        Ok((source, server.name.clone(), server.ip))
    }
}

#[async_trait::async_trait]
impl RequestHandler for GeoDnsHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        self.rate.increment();

        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_recursion_desired(false);
        header.set_recursion_available(false);

        let answers = if request.op_code() == OpCode::Query {
            self.answer(request)
        } else {
            tracing::debug!(op_code = ?request.op_code(), src = %request.src(), "Ignoring non-query opcode");
            Answers {
                records: Vec::new(),
                code: ResponseCode::NoError,
            }
        };
        header.set_response_code(answers.code);

        let mut builder = MessageResponseBuilder::from_message_request(request);
        if request.edns().is_some() {
            let mut edns = Edns::new();
            edns.set_max_payload(EDNS_MAX_PAYLOAD);
            builder.edns(edns);
        }
        let response = builder.build(header, answers.records.iter(), [], [], []);

        response_handle.send_response(response).await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, src = %request.src(), "DNS response write failed");
            header.into()
        })
    }
}
