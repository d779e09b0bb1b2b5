//! Error types for the admin client.

use thiserror::Error;

use tessera_core::CoreError;

/// Result type alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;

/// Errors surfaced by the admin client.
///
/// Command failures keep the backend's original message; `target` names
/// the node (or master port) the operation was acting on.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No target port was ever set before an operation needed a connection.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A command or query failed and the failure is not a known idempotent
    /// outcome. Never retried by the client.
    #[error("{target}: {message}")]
    Cluster { target: String, message: String },

    /// The operation's precondition does not hold for the target node.
    #[error("{0}")]
    Precondition(String),

    /// More than one coordinator claims to be the alive master.
    #[error("cluster reports {} alive masters (query ports {ports:?})", ports.len())]
    MultipleMasters { ports: Vec<u16> },

    #[error("malformed row from {query}: {reason}")]
    MalformedRow { query: &'static str, reason: String },

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AdminError {
    /// Re-target a cluster error at the node being acted upon.
    pub fn acting_on(self, target: impl std::fmt::Display) -> Self {
        match self {
            AdminError::Cluster { message, .. } => AdminError::Cluster {
                target: target.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Original backend message, for cluster errors.
    pub fn cluster_message(&self) -> Option<&str> {
        match self {
            AdminError::Cluster { message, .. } => Some(message),
            _ => None,
        }
    }
}
