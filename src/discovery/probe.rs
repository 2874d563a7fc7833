//! Liveness probe against a backend's client port.
//!
//! A live FSD server greets every new connection with a `$DISERVER` line
//! before the client says anything.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;

pub const BANNER_PREFIX: &str = "$DISERVER:CLIENT:VATSIM FSD";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    ConnectTimeout(SocketAddr),

    #[error("read from {addr} failed: {source}")]
    Read {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no banner from {0} in time")]
    ReadTimeout(SocketAddr),

    #[error("unexpected banner from {addr}: {banner:?}")]
    Banner { addr: SocketAddr, banner: String },
}

/// Connects to `<ip>:<port>` and checks the first line.
#[derive(Debug, Clone)]
pub struct BannerProbe {
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl BannerProbe {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub async fn check(&self, ip: Ipv4Addr) -> Result<(), ProbeError> {
        let addr = SocketAddr::from((ip, self.port));

        let stream = time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProbeError::ConnectTimeout(addr))?
            .map_err(|source| ProbeError::Connect { addr, source })?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        time::timeout(self.read_timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| ProbeError::ReadTimeout(addr))?
            .map_err(|source| ProbeError::Read { addr, source })?;

        if line.starts_with(BANNER_PREFIX) {
            Ok(())
        } else {
            Err(ProbeError::Banner {
                addr,
                banner: line.trim_end().to_string(),
            })
        }
    }
}
