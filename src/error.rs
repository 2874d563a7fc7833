//! Startup failures. Everything after startup is logged and survived.

use thiserror::Error;

use crate::config::ConfigError;
use crate::geo::GeoError;

#[derive(Debug, Error)]
pub enum BalancerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("failed to bind {what}: {source}")]
    Bind {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("DNS: {0}")]
    Dns(#[from] hickory_proto::ProtoError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid static server list: {0}")]
    Discovery(#[from] crate::discovery::SourceError),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BalancerError {
    pub fn bind(what: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| BalancerError::Bind { what, source }
    }
}
