//! Cluster state snapshots produced by a state load.
//!
//! Both types are rebuilt wholesale on every load and never mutated in
//! place; a snapshot is only ever replaced by a newer one.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// One coordinator as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    pub id: NodeId,
    /// Externally published query port. The port the cluster reports is its
    /// in-network view, so this comes from the caller's port mapping.
    pub query_port: Option<u16>,
    pub is_master: bool,
    pub alive: bool,
    pub last_heartbeat: Option<String>,
    pub err_msg: Option<String>,
    /// Internal replication (edit log) port.
    pub edit_log_port: Option<u16>,
}

impl CoordinatorState {
    /// Alive, master-flagged, and addressable from outside the cluster.
    pub fn is_usable_master(&self) -> bool {
        self.is_master && self.alive && self.query_port.is_some()
    }
}

/// One worker as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    pub id: NodeId,
    /// Cluster-assigned backend id.
    pub backend_id: i64,
    pub decommissioned: bool,
    pub alive: bool,
    /// Tablets still resident on this worker.
    pub tablet_num: u64,
    pub last_heartbeat: Option<String>,
    pub err_msg: Option<String>,
    pub heartbeat_port: Option<u16>,
}
