//! tessera-admin — control-plane client for a coordinator/worker SQL cluster.
//!
//! Issues administrative membership commands, tracks live cluster state by
//! polling introspection queries, follows master failover, and drives
//! worker decommissioning to completion.
//!
//! # Architecture
//!
//! ```text
//! discover()                      picks the first port, loads state
//!   └── AdminClient
//!       ├── ConnectionProvider    one cached connection to the master
//!       │   └── AdminConnector    MySqlConnector (or a test double)
//!       ├── State loader          SHOW FRONTENDS / backends() → snapshots,
//!       │                         retargets on master change
//!       ├── Membership            add/drop coordinators and workers,
//!       │                         default storage vault bootstrap
//!       └── Decommission          mark worker, poll until it leaves
//! ```
//!
//! There are no push notifications: convergence is only ever observed by
//! reloading state. Drop and decommission treat "member does not exist"
//! as success via a pluggable [`NotFoundClassifier`]; every other failure
//! reaches the caller with its original message.

pub mod classify;
pub mod client;
pub mod conn;
pub mod decommission;
pub mod discovery;
pub mod error;
mod loader;
mod membership;
pub mod mysql;
pub mod statements;

#[cfg(test)]
mod mock;

pub use classify::{NotFoundClassifier, OperationKind, SubstringClassifier};
pub use client::AdminClient;
pub use conn::{AdminConnection, AdminConnector, ConnectTarget, ConnectionProvider, ResultSet, Row};
pub use decommission::{
    Decommission, DecommissionOutcome, DecommissionPhase, DecommissionProgress, DecommissionReport,
};
pub use discovery::{
    discover, ContainerInventory, MasterRecord, NoMasterRecord, NodeContainer, StaticInventory,
    StatusDirMasterRecord,
};
pub use error::{AdminError, AdminResult};
pub use mysql::MySqlConnector;
