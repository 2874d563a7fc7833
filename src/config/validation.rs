//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 1)
//! - Check hostnames are valid DNS names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>

use hickory_proto::rr::Name;
use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid DNS name: {value}")]
    InvalidName { field: &'static str, value: String },

    #[error("nameservers must list at least two hostnames")]
    TooFewNameservers,

    #[error("default_fsd_server is required outside test mode")]
    MissingDefaultServer,

    #[error("fsd_static_servers entry {0:?} is not name=ip")]
    InvalidStaticServer(String),

    #[error("public_ip_url is not an http(s) URL: {0}")]
    InvalidPublicIpUrl(String),
}

/// Check a loaded configuration, collecting every violation.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.fsd_server_polling_interval == 0 {
        errors.push(ValidationError::Zero { field: "fsd_server_polling_interval" });
    }
    if config.discovery_interval == 0 {
        errors.push(ValidationError::Zero { field: "discovery_interval" });
    }
    if config.fsd_server_remove_failure_count == 0 {
        errors.push(ValidationError::Zero { field: "fsd_server_remove_failure_count" });
    }

    for (field, value) in [
        ("hostname_to_serve", &config.hostname_to_serve),
        ("http_hostname", &config.http_hostname),
        ("zone_name", &config.zone_name),
    ] {
        if value.is_empty() || Name::from_ascii(value).is_err() {
            errors.push(ValidationError::InvalidName { field, value: value.clone() });
        }
    }

    let nameservers = config.nameserver_list();
    if nameservers.len() < 2 {
        errors.push(ValidationError::TooFewNameservers);
    }
    for ns in nameservers {
        if Name::from_ascii(&ns).is_err() {
            errors.push(ValidationError::InvalidName { field: "nameservers", value: ns });
        }
    }

    if !config.test_mode && config.default_fsd_server.is_empty() {
        errors.push(ValidationError::MissingDefaultServer);
    }

    for entry in config.fsd_static_servers.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let valid = entry
            .split_once('=')
            .map(|(name, ip)| !name.is_empty() && ip.trim().parse::<std::net::Ipv4Addr>().is_ok())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidStaticServer(entry.to_string()));
        }
    }

    if !config.public_ip_url.is_empty() {
        let valid = url::Url::parse(&config.public_ip_url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidPublicIpUrl(config.public_ip_url.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
