//! Own public address, answered for the HTTP hostname.

use std::net::Ipv4Addr;
use std::time::Duration;

const DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Ask a plain-text IP echo service for this host's public IPv4.
///
/// Failure is not fatal: the HTTP hostname just gets no answer.
pub async fn detect(url: &str) -> Option<Ipv4Addr> {
    let client = match reqwest::Client::builder().timeout(DETECT_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Could not build HTTP client for public IP detection");
            return None;
        }
    };

    let body = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response.text().await,
        Err(e) => Err(e),
    };

    match body {
        Ok(text) => match text.trim().parse::<Ipv4Addr>() {
            Ok(ip) => {
                tracing::info!(%ip, "Detected public IP");
                Some(ip)
            }
            Err(_) => {
                tracing::warn!(url, body = %text.trim(), "Public IP service returned garbage");
                None
            }
        },
        Err(e) => {
            tracing::warn!(url, error = %e, "Public IP detection failed");
            None
        }
    }
}

/// Configured address, else detection, else nothing.
pub async fn resolve(configured: Option<Ipv4Addr>, url: &str) -> Option<Ipv4Addr> {
    if configured.is_some() {
        return configured;
    }
    if url.is_empty() {
        tracing::info!("Public IP not configured and detection disabled");
        return None;
    }
    detect(url).await
}
