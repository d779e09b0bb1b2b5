//! Error types shared by the core types.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid node endpoint '{0}': expected <ipv4>:<port>")]
    InvalidEndpoint(String),

    #[error("invalid node address '{0}'")]
    InvalidAddress(String),

    #[error("node id {id} is out of range for role {role}")]
    IdOutOfRange { role: String, id: u32 },

    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
