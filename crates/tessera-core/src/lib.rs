//! tessera-core — shared types for the Tessera cluster tooling.
//!
//! Holds the pieces every other crate agrees on: how a node's IP maps to
//! its stable [`NodeId`], the per-role state snapshots produced by a state
//! load, and the TOML configuration for a managed cluster.

pub mod config;
pub mod error;
pub mod node;
pub mod types;

pub use config::{AdminConfig, CloudStoreConfig, ClusterConfig, ContainerConfig};
pub use error::{CoreError, CoreResult};
pub use node::{NodeEndpoint, NodeId, NodeRole, ServiceName};
pub use types::*;
