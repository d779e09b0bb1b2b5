//! State loader: turns the introspection queries into typed snapshots.
//!
//! Each load fully replaces its collection, so callers only ever see one
//! point-in-time view: a node missing from the latest load is gone from the
//! client too.

use std::collections::HashMap;

use tracing::{debug, warn, Instrument};

use tessera_core::{CoordinatorState, NodeId, WorkerState};

use crate::client::AdminClient;
use crate::conn::Row;
use crate::error::{AdminError, AdminResult};
use crate::statements::{LIST_BACKENDS, SHOW_FRONTENDS};

impl AdminClient {
    /// Reload both coordinator and worker states.
    ///
    /// `known_query_ports` maps node id to the externally published query
    /// port; the cluster's own view of its ports is not reachable from here.
    ///
    /// Workers are reloaded even when the coordinator load reports
    /// [`AdminError::MultipleMasters`], so both snapshots come from the same
    /// round; the anomaly is returned afterwards.
    pub async fn load_states(&mut self, known_query_ports: &HashMap<NodeId, u16>) -> AdminResult<()> {
        let coordinators = match self.load_coordinator_states(known_query_ports).await {
            Err(e @ AdminError::MultipleMasters { .. }) => Err(e),
            other => {
                other?;
                Ok(())
            }
        };
        self.load_worker_states().await?;
        coordinators
    }

    /// Reload coordinator states and follow the master.
    ///
    /// When exactly one alive master with a known port is found and it
    /// differs from the current target, the client retargets and drops its
    /// connection. Several alive masters leave the target untouched and
    /// return [`AdminError::MultipleMasters`]; the snapshot is still replaced.
    pub async fn load_coordinator_states(
        &mut self,
        known_query_ports: &HashMap<NodeId, u16>,
    ) -> AdminResult<()> {
        let span = self.span.clone();
        async {
            let rs = self.execute(SHOW_FRONTENDS).await?;

            let mut states = HashMap::with_capacity(rs.len());
            let mut master_ports = Vec::new();
            for row in rs.rows() {
                let fe = parse_coordinator(row, known_query_ports)?;
                debug!(
                    name = row.get("Name").unwrap_or_default(),
                    host = row.get("Host").unwrap_or_default(),
                    role = row.get("Role").unwrap_or_default(),
                    id = %fe.id,
                    alive = fe.alive,
                    is_master = fe.is_master,
                    "coordinator record"
                );
                if let (true, Some(port)) = (fe.is_usable_master(), fe.query_port) {
                    master_ports.push(port);
                }
                states.insert(fe.id, fe);
            }
            self.coordinators = states;

            master_ports.sort_unstable();
            master_ports.dedup();
            match master_ports.as_slice() {
                [] => Ok(()),
                [port] => {
                    if self.conn.target_port() != Some(*port) {
                        self.conn.on_master_changed(*port);
                    }
                    Ok(())
                }
                ports => {
                    warn!(?ports, "more than one alive master reported");
                    Err(AdminError::MultipleMasters {
                        ports: ports.to_vec(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Reload worker states.
    pub async fn load_worker_states(&mut self) -> AdminResult<()> {
        let span = self.span.clone();
        async {
            let rs = self.execute(LIST_BACKENDS).await?;
            let mut states = HashMap::with_capacity(rs.len());
            for row in rs.rows() {
                let be = parse_worker(row)?;
                debug!(
                    id = %be.id,
                    backend_id = be.backend_id,
                    alive = be.alive,
                    decommissioned = be.decommissioned,
                    tablets = be.tablet_num,
                    "worker record"
                );
                states.insert(be.id, be);
            }
            self.workers = states;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

fn parse_coordinator(
    row: Row<'_>,
    known_query_ports: &HashMap<NodeId, u16>,
) -> AdminResult<CoordinatorState> {
    let host = required(row, "Host", SHOW_FRONTENDS)?;
    let id = node_id(host, SHOW_FRONTENDS)?;
    Ok(CoordinatorState {
        id,
        query_port: known_query_ports.get(&id).copied(),
        is_master: parse_flag(row.get("IsMaster")),
        alive: parse_flag(row.get("Alive")),
        last_heartbeat: non_null(row.get("LastHeartbeat")),
        err_msg: non_null(row.get("ErrMsg")),
        edit_log_port: non_null(row.get("EditLogPort")).and_then(|p| p.parse().ok()),
    })
}

fn parse_worker(row: Row<'_>) -> AdminResult<WorkerState> {
    let host = required(row, "Host", LIST_BACKENDS)?;
    Ok(WorkerState {
        id: node_id(host, LIST_BACKENDS)?,
        backend_id: number(row, "BackendId")?,
        decommissioned: parse_flag(row.get("SystemDecommissioned")),
        alive: parse_flag(row.get("Alive")),
        tablet_num: number(row, "TabletNum")?,
        last_heartbeat: non_null(row.get("LastHeartbeat")),
        err_msg: non_null(row.get("ErrMsg")),
        heartbeat_port: non_null(row.get("HeartbeatPort")).and_then(|p| p.parse().ok()),
    })
}

fn required<'a>(row: Row<'a>, column: &str, query: &'static str) -> AdminResult<&'a str> {
    row.get(column).ok_or_else(|| AdminError::MalformedRow {
        query,
        reason: format!("missing {column}"),
    })
}

fn node_id(host: &str, query: &'static str) -> AdminResult<NodeId> {
    NodeId::from_host(host).map_err(|e| AdminError::MalformedRow {
        query,
        reason: e.to_string(),
    })
}

fn number<T: std::str::FromStr>(row: Row<'_>, column: &str) -> AdminResult<T> {
    let raw = required(row, column, LIST_BACKENDS)?;
    raw.trim().parse().map_err(|_| AdminError::MalformedRow {
        query: LIST_BACKENDS,
        reason: format!("{column} is not a number: '{raw}'"),
    })
}

/// Backend boolean columns come back as `true`/`false` or `1`/`0`.
pub(crate) fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v.eq_ignore_ascii_case("true") || v == "1"
    })
}

/// Textual null markers (`NULL`, empty) become `None`.
pub(crate) fn non_null(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(v.to_string())
    }
}
