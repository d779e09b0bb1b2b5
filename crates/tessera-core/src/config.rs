//! cluster.toml configuration parser.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    /// Directory holding the cluster's status files (last known master, ...).
    pub status_dir: Option<PathBuf>,
    #[serde(default)]
    pub admin: AdminConfig,
    pub cloud_store: Option<CloudStoreConfig>,
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
}

/// Parameters for the administrative connection and polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub read_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            password: None,
            host: "127.0.0.1".to_string(),
            read_timeout_secs: 10,
            poll_interval_secs: 5,
        }
    }
}

impl AdminConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Object-storage credentials used to bootstrap the default storage vault.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudStoreConfig {
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub provider: String,
    #[serde(default = "default_vault_name")]
    pub vault_name: String,
}

fn default_vault_name() -> String {
    "default_vault".to_string()
}

impl fmt::Debug for CloudStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudStoreConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("provider", &self.provider)
            .field("vault_name", &self.vault_name)
            .finish()
    }
}

/// Static description of one node container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Service name, `<cluster>-<role>-<index>`.
    pub name: String,
    #[serde(default = "default_running")]
    pub running: bool,
    /// Internal port → published host port. Keys are strings because TOML
    /// table keys must be.
    #[serde(default)]
    pub ports: HashMap<String, u16>,
}

fn default_running() -> bool {
    true
}

impl ContainerConfig {
    pub fn published_port(&self, internal: u16) -> Option<u16> {
        self.ports.get(&internal.to_string()).copied()
    }
}

impl ClusterConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the last-known-master record, if a status dir is configured.
    pub fn master_record_path(&self) -> Option<PathBuf> {
        self.status_dir.as_ref().map(|d| d.join("master_fe_ip"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let config = ClusterConfig::from_toml_str(r#"name = "c1""#).unwrap();
        assert_eq!(config.name, "c1");
        assert_eq!(config.admin, AdminConfig::default());
        assert_eq!(config.admin.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.admin.poll_interval(), Duration::from_secs(5));
        assert!(config.containers.is_empty());
        assert!(config.master_record_path().is_none());
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
name = "c1"
status_dir = "/tmp/c1/status"

[admin]
read_timeout_secs = 3

[cloud_store]
access_key = "ak"
secret_key = "sk"
endpoint = "oss.example.com"
bucket = "b"
region = "r"
provider = "OSS"

[[containers]]
name = "c1-fe-1"
ports = { "9030" = 19030 }

[[containers]]
name = "c1-fe-2"
running = false
"#;
        let config = ClusterConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.admin.user, "root");
        assert_eq!(config.admin.read_timeout_secs, 3);
        assert_eq!(
            config.master_record_path().unwrap(),
            PathBuf::from("/tmp/c1/status/master_fe_ip")
        );

        let store = config.cloud_store.as_ref().unwrap();
        assert_eq!(store.vault_name, "default_vault");
        assert!(!format!("{store:?}").contains("\"sk\""));

        assert_eq!(config.containers[0].published_port(9030), Some(19030));
        assert!(config.containers[0].running);
        assert!(!config.containers[1].running);
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        std::fs::write(&path, "name = \"c2\"\n[admin]\nuser = \"admin\"\n").unwrap();

        let config = ClusterConfig::from_file(&path).unwrap();
        assert_eq!(config.admin.user, "admin");
        assert!(config.to_toml_string().unwrap().contains("c2"));
    }
}
