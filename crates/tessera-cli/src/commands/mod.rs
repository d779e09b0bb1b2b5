pub mod decommission;
pub mod membership;
pub mod status;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tessera_admin::discovery::running_coordinator_ports;
use tessera_admin::{
    discover, AdminClient, ContainerInventory, MasterRecord, MySqlConnector, NoMasterRecord,
    StaticInventory, StatusDirMasterRecord,
};
use tessera_core::{ClusterConfig, NodeEndpoint, NodeId};

/// Everything a command needs to reach the cluster.
pub struct Session {
    pub config: ClusterConfig,
    port: Option<u16>,
}

impl Session {
    pub fn load(path: &Path, port: Option<u16>) -> anyhow::Result<Self> {
        let config = ClusterConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(Self { config, port })
    }

    /// Connect to the cluster's master and load its membership.
    pub async fn client(&self) -> anyhow::Result<AdminClient> {
        let client = AdminClient::new(Arc::new(MySqlConnector), self.config.admin.clone())
            .with_span(tracing::info_span!("cluster", name = %self.config.name));
        let inventory = StaticInventory::from_config(&self.config)?;

        if let Some(port) = self.port {
            let mut client = client;
            client.set_query_port(port);
            client
                .load_states(&self.known_query_ports(&inventory)?)
                .await
                .with_context(|| format!("failed to load cluster state from port {port}"))?;
            return Ok(client);
        }

        let record: Box<dyn MasterRecord> = match self.config.master_record_path() {
            Some(path) => Box::new(StatusDirMasterRecord::new(path)),
            None => Box::new(NoMasterRecord),
        };
        let client = discover(client, &self.config.name, &inventory, record.as_ref(), true)
            .await
            .with_context(|| format!("failed to discover cluster {}", self.config.name))?;

        if client.query_port().is_none() {
            anyhow::bail!(
                "no running coordinator found for cluster {}, pass --port to connect directly",
                self.config.name
            );
        }
        Ok(client)
    }

    /// Published query ports of the running coordinators listed in the
    /// cluster file. Without them the client cannot follow a master move.
    fn known_query_ports(&self, inventory: &StaticInventory) -> anyhow::Result<HashMap<NodeId, u16>> {
        let containers = inventory.containers(&self.config.name)?;
        Ok(running_coordinator_ports(&containers))
    }
}

pub fn parse_endpoint(s: &str) -> anyhow::Result<NodeEndpoint> {
    NodeEndpoint::parse(s).with_context(|| format!("invalid endpoint {s:?}"))
}
