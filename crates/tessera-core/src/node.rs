//! Node identity: roles, stable ids, and endpoint parsing.
//!
//! Every node in a managed cluster lives on a fixed subnet and its IP is
//! assigned from its role and index. That makes the id recoverable from the
//! IP alone, which is what lets successive state loads be diffed: the same
//! host always resolves to the same [`NodeId`].
//!
//! ```text
//! seq = id + IP_PART4_SIZE + role_window * ID_LIMIT
//! ip  = <subnet>.(seq / IP_PART4_SIZE).(seq % IP_PART4_SIZE)
//! ```

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Width of the last-octet range used per third-octet step.
pub const IP_PART4_SIZE: u32 = 200;

/// Width of the id window reserved for each role.
pub const ID_LIMIT: u32 = 10_000;

/// Largest id that still round-trips through an IP in its role window.
pub const MAX_NODE_ID: u32 = ID_LIMIT - IP_PART4_SIZE;

/// Role a node plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Accepts queries and may hold mastership.
    Coordinator,
    /// Holds tablets.
    Worker,
    /// Cloud-mode meta service.
    MetaService,
    /// Cloud-mode recycler.
    Recycler,
    /// FoundationDB process backing the meta service.
    Fdb,
}

impl NodeRole {
    /// Short label used in service names (`<cluster>-<label>-<index>`).
    pub fn label(&self) -> &'static str {
        match self {
            NodeRole::Coordinator => "fe",
            NodeRole::Worker => "be",
            NodeRole::MetaService => "ms",
            NodeRole::Recycler => "recycle",
            NodeRole::Fdb => "fdb",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "fe" => Some(NodeRole::Coordinator),
            "be" => Some(NodeRole::Worker),
            "ms" => Some(NodeRole::MetaService),
            "recycle" => Some(NodeRole::Recycler),
            "fdb" => Some(NodeRole::Fdb),
            _ => None,
        }
    }

    fn window(&self) -> u32 {
        match self {
            NodeRole::Coordinator => 0,
            NodeRole::Worker => 1,
            NodeRole::MetaService => 2,
            NodeRole::Recycler => 3,
            NodeRole::Fdb => 4,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stable per-role node identifier derived from the node's IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Derive the node id from an IPv4 address.
    ///
    /// Only the last two octets participate; the role window is folded
    /// away, so a coordinator and a worker with the same index share an id.
    pub fn from_ip(ip: Ipv4Addr) -> CoreResult<Self> {
        let [_, _, part3, part4] = ip.octets();
        let mut seq = u32::from(part3) * IP_PART4_SIZE + u32::from(part4);
        while seq > ID_LIMIT {
            seq -= ID_LIMIT;
        }
        match seq.checked_sub(IP_PART4_SIZE) {
            Some(id) if id > 0 => Ok(NodeId(id)),
            _ => Err(CoreError::InvalidAddress(ip.to_string())),
        }
    }

    /// Parse the host text of an endpoint and derive its id.
    pub fn from_host(host: &str) -> CoreResult<Self> {
        let ip = Ipv4Addr::from_str(host.trim())
            .map_err(|_| CoreError::InvalidAddress(host.to_string()))?;
        Self::from_ip(ip)
    }

    /// Inverse of [`NodeId::from_ip`] for a given subnet and role.
    pub fn to_ip(self, subnet: [u8; 2], role: NodeRole) -> CoreResult<Ipv4Addr> {
        if self.0 == 0 || self.0 > MAX_NODE_ID {
            return Err(CoreError::IdOutOfRange {
                role: role.to_string(),
                id: self.0,
            });
        }
        let seq = self.0 + IP_PART4_SIZE + role.window() * ID_LIMIT;
        let part3 = u8::try_from(seq / IP_PART4_SIZE).map_err(|_| CoreError::IdOutOfRange {
            role: role.to_string(),
            id: self.0,
        })?;
        // seq % 200 always fits.
        let part4 = (seq % IP_PART4_SIZE) as u8;
        Ok(Ipv4Addr::new(subnet[0], subnet[1], part3, part4))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node's `host:port` endpoint as registered with the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeEndpoint {
    addr: SocketAddrV4,
    id: NodeId,
}

impl NodeEndpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> CoreResult<Self> {
        Ok(Self {
            addr: SocketAddrV4::new(ip, port),
            id: NodeId::from_ip(ip)?,
        })
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        let addr = SocketAddrV4::from_str(s.trim())
            .map_err(|_| CoreError::InvalidEndpoint(s.to_string()))?;
        Self::new(*addr.ip(), addr.port())
    }

    pub fn ip(&self) -> Ipv4Addr {
        *self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Node id derived from the host portion.
    pub fn node_id(&self) -> NodeId {
        self.id
    }
}

impl FromStr for NodeEndpoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Decomposed container service name: `<cluster>-<role>-<index>`.
///
/// Cluster names may themselves contain `-`, so the name is split from
/// the right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceName {
    pub cluster: String,
    pub role: NodeRole,
    pub id: NodeId,
}

impl ServiceName {
    pub fn parse(name: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidServiceName(name.to_string());
        let mut parts = name.trim_start_matches('/').rsplitn(3, '-');
        let index = parts.next().ok_or_else(invalid)?;
        let role = parts.next().ok_or_else(invalid)?;
        let cluster = parts.next().filter(|c| !c.is_empty()).ok_or_else(invalid)?;

        let role = NodeRole::from_label(role).ok_or_else(invalid)?;
        let id = index.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            cluster: cluster.to_string(),
            role,
            id: NodeId(id),
        })
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.cluster, self.role, self.id)
    }
}
