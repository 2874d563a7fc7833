//! Configuration schema definitions.
//!
//! Keys mirror the environment variable names the balancer has always been
//! deployed with (`DNS_PORT`, `FSD_SLOT_BUFFER`, ...). The `config` crate
//! lowercases environment keys, so every field is the snake_case form of
//! its variable.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Port for the Prometheus scrape endpoint (0 disables it).
    pub prometheus_metrics_port: u16,

    /// Port for the data surface (`/submit_data`, `/dns_ip_override`).
    pub http_data_port: u16,

    /// Port for the plain-HTTP lookup surface (0 disables it).
    pub http_endpoint_port: u16,

    /// Port the DNS server listens on, UDP and TCP.
    pub dns_port: u16,

    /// TTL for synthesized A records, in seconds.
    pub dns_ttl: u32,

    /// Hostname answered with the selected backend.
    pub hostname_to_serve: String,

    /// Hostname answered with this process's own public address.
    pub http_hostname: String,

    /// Zone apex for SOA and NS answers.
    pub zone_name: String,

    /// Comma-separated nameserver hostnames. The first is the SOA mname,
    /// the second the SOA mailbox.
    pub nameservers: String,

    /// Backend returned when nothing else is eligible.
    pub default_fsd_server: String,

    /// Capacity poll interval in seconds.
    pub fsd_server_polling_interval: u64,

    /// Minimum remaining slots for a backend to stay eligible.
    pub fsd_slot_buffer: i64,

    /// Consecutive poll failures before a backend is evicted.
    pub fsd_server_remove_failure_count: u32,

    /// Port of each backend's metrics endpoint.
    pub fsd_metrics_port: u16,

    /// Port of each backend's client protocol, used for the banner probe.
    pub fsd_probe_port: u16,

    /// Discovery refresh interval in seconds.
    pub discovery_interval: u64,

    /// Comma-separated substrings; matching candidate names are skipped.
    pub discovery_exclude: String,

    /// Required first label of candidate names.
    pub discovery_prefix: String,

    /// Static candidate feed, `name=ip` pairs separated by commas.
    pub fsd_static_servers: String,

    /// Path to the GeoLite2-City database.
    pub geoip_database: PathBuf,

    /// Public address answered for `http_hostname`. Detected when unset.
    pub public_ip: Option<Ipv4Addr>,

    /// Plain-text "what is my IP" service used when `public_ip` is unset.
    /// Empty disables detection.
    pub public_ip_url: String,

    /// Disables discovery and capacity scraping; backends come from
    /// `/submit_data` only.
    pub test_mode: bool,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            prometheus_metrics_port: 9102,
            http_data_port: 8080,
            http_endpoint_port: 8081,
            dns_port: 10053,
            dns_ttl: 10,
            hostname_to_serve: "fsd.connect.vatsim.net".to_string(),
            http_hostname: "fsd-http.connect.vatsim.net".to_string(),
            zone_name: "connect.vatsim.net".to_string(),
            nameservers: "prod-vatdns-hj146.server.vatsim.net,prod-vatdns-ad137.server.vatsim.net"
                .to_string(),
            default_fsd_server: String::new(),
            fsd_server_polling_interval: 5,
            fsd_slot_buffer: 0,
            fsd_server_remove_failure_count: 2,
            fsd_metrics_port: 9001,
            fsd_probe_port: 6809,
            discovery_interval: 60,
            discovery_exclude: "hub,sweatbox".to_string(),
            discovery_prefix: "fsd".to_string(),
            fsd_static_servers: String::new(),
            geoip_database: PathBuf::from("GeoLite2-City.mmdb"),
            public_ip: None,
            public_ip_url: "https://api.ipify.org".to_string(),
            test_mode: false,
            log_level: "info".to_string(),
        }
    }
}

impl BalancerConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.fsd_server_polling_interval)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval)
    }

    /// Exclusion substrings with blanks dropped.
    pub fn exclusions(&self) -> Vec<String> {
        split_list(&self.discovery_exclude)
    }

    /// Nameserver hostnames in configured order.
    pub fn nameserver_list(&self) -> Vec<String> {
        split_list(&self.nameservers)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
