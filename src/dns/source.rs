//! Which address a lookup is answered for.
//!
//! Precedence: operator override, then the EDNS0 client-subnet address,
//! then the transport peer.

use arc_swap::ArcSwapOption;
use hickory_proto::op::Edns;
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Operator-set source address applied to every lookup while present.
#[derive(Debug, Default)]
pub struct SourceOverride {
    current: ArcSwapOption<IpAddr>,
}

impl SourceOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ip: IpAddr) {
        self.current.store(Some(Arc::new(ip)));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    pub fn get(&self) -> Option<IpAddr> {
        self.current.load().as_deref().copied()
    }
}

/// Where a resolved source address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Override,
    ClientSubnet,
    Header,
    Peer,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Override => "override",
            SourceKind::ClientSubnet => "client-subnet",
            SourceKind::Header => "header",
            SourceKind::Peer => "peer",
        })
    }
}

/// A source address and its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySource {
    pub ip: IpAddr,
    pub kind: SourceKind,
}

impl QuerySource {
    /// Resolve in precedence order. `hint` is the best address the
    /// protocol offers beyond the peer (ECS for DNS, forwarding headers
    /// for HTTP).
    pub fn resolve(override_ip: Option<IpAddr>, hint: Option<(IpAddr, SourceKind)>, peer: IpAddr) -> Self {
        if let Some(ip) = override_ip {
            return Self {
                ip,
                kind: SourceKind::Override,
            };
        }
        if let Some((ip, kind)) = hint {
            return Self { ip, kind };
        }
        Self {
            ip: peer,
            kind: SourceKind::Peer,
        }
    }
}

/// EDNS0 client-subnet address carried by a request, if any.
pub fn client_subnet(edns: Option<&Edns>) -> Option<IpAddr> {
    match edns?.options().get(EdnsCode::Subnet)? {
        // A zero-length source prefix carries no location.
        EdnsOption::Subnet(subnet) if subnet.source_prefix() == 0 => None,
        EdnsOption::Subnet(subnet) => Some(subnet.addr()),
        _ => None,
    }
}
