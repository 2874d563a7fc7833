//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the registry and everything that shares it
//! - Bind every listener before serving anything
//! - Start background tasks (query rate, discovery)
//! - Serve DNS until the process exits
//!
//! # Design Decisions
//! - Fail fast: a bind failure is fatal
//! - No graceful shutdown; the process runs until killed

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::BalancerConfig;
use crate::discovery::{BannerProbe, CandidateFilter, CandidateSource, DiscoveryManager, StaticSource};
use crate::dns::{DnsListeners, DnsServer, GeoDnsHandler, HandlerSettings, SourceOverride, ZoneRecords};
use crate::error::BalancerError;
use crate::geo::GeoLocator;
use crate::health::{PollerSettings, PollerSpawner};
use crate::http::{data_router, endpoint_router, AppState, HttpServer};
use crate::load_balancer::SelectionEngine;
use crate::observability::metrics::QueryRate;
use crate::registry::ServerRegistry;

/// Every long-lived component, wired but not yet listening.
pub struct Balancer {
    config: BalancerConfig,
    registry: Arc<ServerRegistry>,
    engine: Arc<SelectionEngine>,
    spawner: PollerSpawner,
    source_override: Arc<SourceOverride>,
    rate: Arc<QueryRate>,
    candidates: Arc<dyn CandidateSource>,
    public_ip: Option<Ipv4Addr>,
}

impl Balancer {
    pub fn new(
        config: BalancerConfig,
        locator: Arc<dyn GeoLocator>,
        public_ip: Option<Ipv4Addr>,
    ) -> Result<Self, BalancerError> {
        let registry = Arc::new(ServerRegistry::new());
        let engine = Arc::new(SelectionEngine::new(
            registry.clone(),
            locator,
            config.default_fsd_server.clone(),
            config.fsd_slot_buffer,
        ));
        let spawner = PollerSpawner::new(registry.clone(), PollerSettings::from_config(&config));
        let candidates: Arc<dyn CandidateSource> = Arc::new(StaticSource::parse(&config.fsd_static_servers)?);

        Ok(Self {
            config,
            registry,
            engine,
            spawner,
            source_override: Arc::new(SourceOverride::new()),
            rate: Arc::new(QueryRate::new()),
            candidates,
            public_ip,
        })
    }

    /// Replace the configured static candidate list.
    pub fn with_candidates(mut self, candidates: Arc<dyn CandidateSource>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Bind all listeners, then start serving.
    pub async fn start(self) -> Result<RunningBalancer, BalancerError> {
        let config = &self.config;

        let zone = ZoneRecords::new(&config.zone_name, &config.nameserver_list())?;
        let settings = HandlerSettings::new(
            &config.hostname_to_serve,
            &config.http_hostname,
            config.dns_ttl,
            self.public_ip,
        )?;

        let dns_listeners = DnsListeners::bind(any_addr(config.dns_port))
            .await
            .map_err(BalancerError::bind("DNS listener"))?;
        let data_listener = TcpListener::bind(any_addr(config.http_data_port))
            .await
            .map_err(BalancerError::bind("data HTTP listener"))?;
        let endpoint_listener = if config.http_endpoint_port == 0 {
            None
        } else {
            Some(
                TcpListener::bind(any_addr(config.http_endpoint_port))
                    .await
                    .map_err(BalancerError::bind("endpoint HTTP listener"))?,
            )
        };

        let dns_addr = dns_listeners.local_addr().map_err(BalancerError::bind("DNS listener"))?;
        let data_addr = data_listener
            .local_addr()
            .map_err(BalancerError::bind("data HTTP listener"))?;
        let endpoint_addr = match &endpoint_listener {
            Some(listener) => Some(
                listener
                    .local_addr()
                    .map_err(BalancerError::bind("endpoint HTTP listener"))?,
            ),
            None => None,
        };

        let state = AppState {
            registry: self.registry.clone(),
            engine: self.engine.clone(),
            spawner: self.spawner.clone(),
            source_override: self.source_override.clone(),
            rate: self.rate.clone(),
        };

        let mut tasks = Vec::new();
        tasks.push(spawn_http(HttpServer::new("data", data_router(state.clone())), data_listener));
        if let Some(listener) = endpoint_listener {
            tasks.push(spawn_http(HttpServer::new("endpoint", endpoint_router(state)), listener));
        }
        tasks.push(tokio::spawn(self.rate.clone().report()));

        let discovery = DiscoveryManager::new(
            self.candidates.clone(),
            self.registry.clone(),
            self.spawner.clone(),
            BannerProbe::new(config.fsd_probe_port),
            CandidateFilter::from_config(config),
            config.discovery_interval(),
        )
        .test_mode(config.test_mode);
        tasks.push(tokio::spawn(discovery.run()));

        let handler = GeoDnsHandler::new(
            self.engine.clone(),
            zone,
            settings,
            self.source_override.clone(),
            self.rate.clone(),
        );
        let dns = tokio::spawn(DnsServer::new(handler, dns_listeners).run());

        tracing::info!(
            dns = %dns_addr,
            data = %data_addr,
            endpoint = ?endpoint_addr,
            default_server = %config.default_fsd_server,
            test_mode = config.test_mode,
            "Balancer started"
        );

        Ok(RunningBalancer {
            dns_addr,
            data_addr,
            endpoint_addr,
            registry: self.registry,
            dns,
            tasks,
        })
    }
}

/// Handles to a started balancer.
pub struct RunningBalancer {
    pub dns_addr: SocketAddr,
    pub data_addr: SocketAddr,
    pub endpoint_addr: Option<SocketAddr>,
    pub registry: Arc<ServerRegistry>,
    dns: JoinHandle<Result<(), hickory_proto::ProtoError>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningBalancer {
    /// Block on the DNS server.
    pub async fn wait(self) -> Result<(), BalancerError> {
        let result = self.dns.await;
        for task in &self.tasks {
            task.abort();
        }
        result??;
        Ok(())
    }

    /// Stop every task.
    pub fn abort(&self) {
        self.dns.abort();
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn any_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

fn spawn_http(server: HttpServer, listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = server.run(listener).await {
            tracing::error!(error = %e, "HTTP server failed");
        }
    })
}
