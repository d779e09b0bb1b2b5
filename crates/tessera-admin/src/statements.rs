//! Fixed administrative statement templates.

use tessera_core::{CloudStoreConfig, NodeEndpoint};

/// Coordinator introspection.
pub const SHOW_FRONTENDS: &str = "SHOW FRONTENDS";

/// Worker introspection.
pub const LIST_BACKENDS: &str = "SELECT BackendId, Host, LastHeartbeat, Alive, \
     SystemDecommissioned, TabletNum, ErrMsg, HeartbeatPort FROM backends()";

pub fn add_follower(endpoint: &NodeEndpoint) -> String {
    format!("ALTER SYSTEM ADD FOLLOWER '{endpoint}'")
}

pub fn drop_follower(endpoint: &NodeEndpoint) -> String {
    format!("ALTER SYSTEM DROP FOLLOWER '{endpoint}'")
}

pub fn add_backend(endpoint: &NodeEndpoint) -> String {
    format!("ALTER SYSTEM ADD BACKEND '{endpoint}'")
}

/// Forced drop: the backend is removed without migrating its tablets.
pub fn drop_backend(endpoint: &NodeEndpoint) -> String {
    format!("ALTER SYSTEM DROPP BACKEND '{endpoint}'")
}

pub fn decommission_backend(endpoint: &NodeEndpoint) -> String {
    format!("ALTER SYSTEM DECOMMISSION BACKEND '{endpoint}'")
}

pub fn create_s3_vault(config: &CloudStoreConfig, root_path: &str) -> String {
    format!(
        r#"CREATE STORAGE VAULT IF NOT EXISTS {name}
PROPERTIES (
    "type" = "S3",
    "s3.access_key" = "{ak}",
    "s3.secret_key" = "{sk}",
    "s3.endpoint" = "{endpoint}",
    "s3.bucket" = "{bucket}",
    "s3.region" = "{region}",
    "s3.root.path" = "{root_path}",
    "provider" = "{provider}"
)"#,
        name = config.vault_name,
        ak = quoted(&config.access_key),
        sk = quoted(&config.secret_key),
        endpoint = quoted(&config.endpoint),
        bucket = quoted(&config.bucket),
        region = quoted(&config.region),
        root_path = quoted(root_path),
        provider = quoted(&config.provider),
    )
}

pub fn set_default_vault(vault_name: &str) -> String {
    format!("SET {vault_name} AS DEFAULT STORAGE VAULT")
}

/// Escape text for a double-quoted property value.
fn quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
