//! Cluster discovery: find a coordinator to talk to and load live state.
//!
//! The container runtime and the status directory are external; they are
//! consumed through [`ContainerInventory`] and [`MasterRecord`].
//!
//! Initial target port, in order of preference:
//! 1. the running coordinator whose id matches the last recorded master,
//! 2. coordinator 1 (a fresh cluster's bootstrap master),
//! 3. the running coordinator with the lowest id.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, warn, Instrument};

use tessera_core::{ClusterConfig, CoreResult, NodeId, NodeRole, ServiceName};

use crate::client::AdminClient;
use crate::error::{AdminError, AdminResult};

/// Internal query port of a coordinator container.
pub const COORDINATOR_QUERY_PORT: u16 = 9030;

/// One node container as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContainer {
    pub service: ServiceName,
    pub running: bool,
    /// Internal port → published host port.
    pub ports: HashMap<u16, u16>,
}

/// Lists the node containers of a cluster.
pub trait ContainerInventory: Send + Sync {
    fn containers(&self, cluster: &str) -> AdminResult<Vec<NodeContainer>>;
}

/// Read-only access to the last recorded master address.
pub trait MasterRecord: Send + Sync {
    fn last_master_address(&self, cluster: &str) -> AdminResult<Option<String>>;
}

/// Inventory fixed up front, e.g. from `cluster.toml`.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    containers: Vec<NodeContainer>,
}

impl StaticInventory {
    pub fn new(containers: Vec<NodeContainer>) -> Self {
        Self { containers }
    }

    pub fn from_config(config: &ClusterConfig) -> CoreResult<Self> {
        let containers = config
            .containers
            .iter()
            .map(|c| {
                let ports = c
                    .ports
                    .iter()
                    .filter_map(|(k, v)| k.parse::<u16>().ok().map(|k| (k, *v)))
                    .collect();
                Ok(NodeContainer {
                    service: ServiceName::parse(&c.name)?,
                    running: c.running,
                    ports,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { containers })
    }
}

impl ContainerInventory for StaticInventory {
    fn containers(&self, cluster: &str) -> AdminResult<Vec<NodeContainer>> {
        Ok(self
            .containers
            .iter()
            .filter(|c| c.service.cluster == cluster)
            .cloned()
            .collect())
    }
}

/// Master record kept as a plain text file in the cluster's status dir.
#[derive(Debug, Clone)]
pub struct StatusDirMasterRecord {
    path: PathBuf,
}

impl StatusDirMasterRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MasterRecord for StatusDirMasterRecord {
    fn last_master_address(&self, _cluster: &str) -> AdminResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AdminError::Discovery(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// No master has ever been recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMasterRecord;

impl MasterRecord for NoMasterRecord {
    fn last_master_address(&self, _cluster: &str) -> AdminResult<Option<String>> {
        Ok(None)
    }
}

/// Published query ports of the running coordinators, by node id.
pub fn running_coordinator_ports(containers: &[NodeContainer]) -> HashMap<NodeId, u16> {
    containers
        .iter()
        .filter(|c| c.running && c.service.role == NodeRole::Coordinator)
        .filter_map(|c| {
            c.ports
                .get(&COORDINATOR_QUERY_PORT)
                .map(|port| (c.service.id, *port))
        })
        .collect()
}

/// Pick the port to address first.
pub fn initial_query_port(
    ports: &HashMap<NodeId, u16>,
    last_master: Option<&str>,
) -> Option<u16> {
    let recorded = last_master.and_then(|addr| match NodeId::from_host(addr) {
        Ok(id) => ports.get(&id).copied(),
        Err(e) => {
            warn!(%addr, error = %e, "ignoring unparsable master record");
            None
        }
    });

    recorded
        .or_else(|| ports.get(&NodeId(1)).copied())
        .or_else(|| ports.iter().min_by_key(|(id, _)| **id).map(|(_, p)| *p))
}

/// Bootstrap `client` against a running cluster.
///
/// Returns the client untouched when no coordinator is running. With
/// `require_loaded`, a failed state load is returned as an error; without
/// it, the client comes back with whatever the load managed to populate.
pub async fn discover(
    mut client: AdminClient,
    cluster: &str,
    inventory: &dyn ContainerInventory,
    master_record: &dyn MasterRecord,
    require_loaded: bool,
) -> AdminResult<AdminClient> {
    let span = client.span.clone();
    async {
        let containers = inventory.containers(cluster)?;
        let ports = running_coordinator_ports(&containers);
        if ports.is_empty() {
            debug!(%cluster, "no running coordinator, returning unpopulated client");
            return Ok(client);
        }

        let last_master = master_record.last_master_address(cluster)?;
        let Some(port) = initial_query_port(&ports, last_master.as_deref()) else {
            return Ok(client);
        };
        info!(%cluster, port, last_master = ?last_master, "initial query port selected");
        client.set_query_port(port);

        match client.load_states(&ports).await {
            Ok(()) => Ok(client),
            Err(e) if require_loaded => Err(e),
            Err(e) => {
                warn!(%cluster, error = %e, "state load failed, continuing with partial state");
                Ok(client)
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::ResultSet;
    use crate::mock::{backends, frontends, is_frontends, MockCluster};
    use tessera_core::AdminConfig;

    fn coordinator(cluster: &str, id: u32, port: u16, running: bool) -> NodeContainer {
        NodeContainer {
            service: ServiceName::parse(&format!("{cluster}-fe-{id}")).unwrap(),
            running,
            ports: HashMap::from([(COORDINATOR_QUERY_PORT, port), (8030, port + 1000)]),
        }
    }

    fn worker(cluster: &str, id: u32) -> NodeContainer {
        NodeContainer {
            service: ServiceName::parse(&format!("{cluster}-be-{id}")).unwrap(),
            running: true,
            ports: HashMap::from([(9050, 19050)]),
        }
    }

    fn ports(pairs: &[(u32, u16)]) -> HashMap<NodeId, u16> {
        pairs.iter().map(|(id, p)| (NodeId(*id), *p)).collect()
    }

    #[test]
    fn prefers_recorded_master() {
        let p = ports(&[(1, 9030), (2, 9031), (3, 9032)]);
        assert_eq!(initial_query_port(&p, Some("172.20.1.2")), Some(9031));
    }

    #[test]
    fn falls_back_to_node_one() {
        let p = ports(&[(1, 9030), (2, 9031), (3, 9032)]);
        assert_eq!(initial_query_port(&p, None), Some(9030));
        // Recorded master no longer running.
        assert_eq!(initial_query_port(&p, Some("172.20.1.7")), Some(9030));
        assert_eq!(initial_query_port(&p, Some("garbage")), Some(9030));
    }

    #[test]
    fn falls_back_to_lowest_id() {
        let p = ports(&[(3, 9032), (2, 9031)]);
        assert_eq!(initial_query_port(&p, None), Some(9031));
        assert_eq!(initial_query_port(&HashMap::new(), None), None);
    }

    #[test]
    fn only_running_coordinators_count() {
        let containers = vec![
            coordinator("c1", 1, 9030, false),
            coordinator("c1", 2, 9031, true),
            worker("c1", 1),
        ];
        assert_eq!(running_coordinator_ports(&containers), ports(&[(2, 9031)]));
    }

    #[test]
    fn master_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master_fe_ip");
        let record = StatusDirMasterRecord::new(&path);
        assert_eq!(record.last_master_address("c1").unwrap(), None);

        std::fs::write(&path, "172.20.1.3\n").unwrap();
        assert_eq!(
            record.last_master_address("c1").unwrap().as_deref(),
            Some("172.20.1.3")
        );

        std::fs::write(&path, "").unwrap();
        assert_eq!(record.last_master_address("c1").unwrap(), None);
    }

    #[test]
    fn inventory_from_config() {
        let config = ClusterConfig::from_toml_str(
            r#"
name = "c1"

[[containers]]
name = "c1-fe-1"
ports = { "9030" = 19030 }

[[containers]]
name = "other-fe-1"
ports = { "9030" = 29030 }
"#,
        )
        .unwrap();
        let inventory = StaticInventory::from_config(&config).unwrap();
        let containers = inventory.containers("c1").unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(running_coordinator_ports(&containers), ports(&[(1, 19030)]));
    }

    #[tokio::test]
    async fn no_running_coordinator_returns_empty_client() {
        let cluster = MockCluster::new();
        let client = AdminClient::new(cluster.connector(), AdminConfig::default());
        let inventory = StaticInventory::new(vec![coordinator("c1", 1, 9030, false)]);

        let client = discover(client, "c1", &inventory, &NoMasterRecord, true)
            .await
            .unwrap();
        assert_eq!(client.query_port(), None);
        assert!(cluster.connects().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_targets_node_one_and_loads() {
        let cluster = MockCluster::new();
        cluster.respond(|_, sql| {
            Ok(if is_frontends(sql) {
                frontends(&[
                    ("172.20.1.1", true, true),
                    ("172.20.1.2", false, true),
                    ("172.20.1.3", false, true),
                ])
            } else {
                backends(&[("172.20.51.1", true, 3)])
            })
        });
        let client = AdminClient::new(cluster.connector(), AdminConfig::default());
        let inventory = StaticInventory::new(vec![
            coordinator("c1", 3, 9032, true),
            coordinator("c1", 1, 9030, true),
            coordinator("c1", 2, 9031, true),
        ]);

        let client = discover(client, "c1", &inventory, &NoMasterRecord, true)
            .await
            .unwrap();
        assert_eq!(client.query_port(), Some(9030));
        assert_eq!(cluster.connects(), vec![(1, 9030)]);
        assert_eq!(client.coordinators().len(), 3);
        assert_eq!(client.get_coordinator(NodeId(2)).unwrap().query_port, Some(9031));
        assert_eq!(client.workers().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_follows_reported_master() {
        let cluster = MockCluster::new();
        cluster.respond(|_, sql| {
            Ok(if is_frontends(sql) {
                frontends(&[("172.20.1.1", false, true), ("172.20.1.2", true, true)])
            } else {
                ResultSet::default()
            })
        });
        let client = AdminClient::new(cluster.connector(), AdminConfig::default());
        let inventory = StaticInventory::new(vec![
            coordinator("c1", 1, 9030, true),
            coordinator("c1", 2, 9031, true),
        ]);

        let client = discover(client, "c1", &inventory, &NoMasterRecord, true)
            .await
            .unwrap();
        assert_eq!(client.query_port(), Some(9031));
        assert_eq!(cluster.connects(), vec![(1, 9030), (2, 9031)]);
    }

    #[tokio::test]
    async fn load_failure_modes() {
        let inventory = StaticInventory::new(vec![coordinator("c1", 1, 9030, true)]);

        let cluster = MockCluster::new();
        cluster.respond(|_, _| Err("Can't connect".into()));
        let client = AdminClient::new(cluster.connector(), AdminConfig::default());
        let err = discover(client, "c1", &inventory, &NoMasterRecord, true)
            .await
            .unwrap_err();
        assert_eq!(err.cluster_message(), Some("Can't connect"));

        let client = AdminClient::new(cluster.connector(), AdminConfig::default());
        let client = discover(client, "c1", &inventory, &NoMasterRecord, false)
            .await
            .unwrap();
        assert_eq!(client.query_port(), Some(9030));
        assert!(client.coordinators().is_empty());
    }
}
