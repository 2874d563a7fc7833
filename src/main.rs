//! Geo-aware DNS load balancer.
//!
//! ```text
//!   DNS query / HTTP GET /                    FSD backends
//!          │                                       ▲  ▲
//!          ▼                                       │  │ /metrics every 5s
//!   ┌─────────────┐   ┌───────────┐   ┌──────────┐ │  │
//!   │ dns / http  │──▶│ selection │──▶│ registry │◀┼──┘ capacity pollers
//!   └─────────────┘   └─────┬─────┘   └──────────┘ │
//!                           │               ▲      │ banner probe
//!                     GeoLite2 lookup       └──────┘ discovery
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use geo_dns_balancer::config::load_config;
use geo_dns_balancer::geo::MaxMindLocator;
use geo_dns_balancer::lifecycle::public_ip;
use geo_dns_balancer::observability::{logging, metrics};
use geo_dns_balancer::Balancer;

#[derive(Parser)]
#[command(name = "geo-dns-balancer")]
#[command(about = "Geo-aware DNS load balancer for FSD servers", long_about = None)]
struct Cli {
    /// Optional TOML file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init(&config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "geo-dns-balancer starting");

    if config.prometheus_metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.prometheus_metrics_port));
        let idle = (config.polling_interval() * 3).max(Duration::from_secs(30));
        metrics::init_metrics(addr, idle)?;
    }

    let locator = Arc::new(MaxMindLocator::open(&config.geoip_database)?);
    let public_ip = public_ip::resolve(config.public_ip, &config.public_ip_url).await;

    tracing::info!(
        dns_port = config.dns_port,
        hostname = %config.hostname_to_serve,
        default_server = %config.default_fsd_server,
        polling_interval_secs = config.fsd_server_polling_interval,
        "Configuration loaded"
    );

    let running = Balancer::new(config, locator, public_ip)?.start().await?;
    running.wait().await?;

    Ok(())
}
