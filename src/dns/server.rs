//! DNS listener setup.

use hickory_server::ServerFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};

use crate::dns::handler::GeoDnsHandler;

/// Idle timeout for TCP DNS connections.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// UDP socket and TCP listener bound to the same address.
pub struct DnsListeners {
    pub udp: UdpSocket,
    pub tcp: TcpListener,
}

impl DnsListeners {
    /// Bind both transports. TCP takes the port UDP was given, so port 0
    /// yields one shared ephemeral port.
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let udp = UdpSocket::bind(addr).await?;
        let addr = udp.local_addr()?;
        tracing::info!(%addr, "DNS UDP listening");
        let tcp = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "DNS TCP listening");
        Ok(Self { udp, tcp })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.udp.local_addr()
    }
}

/// Serves the zone until the process exits.
pub struct DnsServer {
    handler: GeoDnsHandler,
    listeners: DnsListeners,
}

impl DnsServer {
    pub fn new(handler: GeoDnsHandler, listeners: DnsListeners) -> Self {
        Self { handler, listeners }
    }

    pub async fn run(self) -> Result<(), hickory_proto::ProtoError> {
        let mut server = ServerFuture::new(self.handler);
        server.register_socket(self.listeners.udp);
        server.register_listener(self.listeners.tcp, TCP_TIMEOUT);

        tracing::info!("DNS server ready to serve queries");
        server.block_until_done().await
    }
}
