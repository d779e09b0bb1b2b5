//! The admin client: owns the connection and the latest state snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use tessera_core::{AdminConfig, CoordinatorState, NodeId, WorkerState};

use crate::classify::{NotFoundClassifier, SubstringClassifier};
use crate::conn::{AdminConnector, ConnectionProvider, ResultSet};
use crate::error::AdminResult;

/// Control-plane client for one cluster.
///
/// Every verb takes `&mut self`: one client issues its statements strictly
/// in call order over a single connection. Managing several clusters means
/// one client per cluster; clients share nothing.
pub struct AdminClient {
    pub(crate) conn: ConnectionProvider,
    pub(crate) coordinators: HashMap<NodeId, CoordinatorState>,
    pub(crate) workers: HashMap<NodeId, WorkerState>,
    pub(crate) classifier: Arc<dyn NotFoundClassifier>,
    pub(crate) poll_interval: Duration,
    pub(crate) span: Span,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("conn", &self.conn)
            .field("coordinators", &self.coordinators.len())
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    /// Create an unpopulated client. No connection is made until the first
    /// operation, and none can be made before a query port is set.
    pub fn new(connector: Arc<dyn AdminConnector>, config: AdminConfig) -> Self {
        let poll_interval = config.poll_interval();
        Self {
            conn: ConnectionProvider::new(connector, config),
            coordinators: HashMap::new(),
            workers: HashMap::new(),
            classifier: Arc::new(SubstringClassifier::default()),
            poll_interval,
            span: Span::none(),
        }
    }

    /// Replace the not-found classifier used by drop and decommission.
    pub fn with_classifier(mut self, classifier: Arc<dyn NotFoundClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Span every operation of this client is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Interval between decommission progress polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn set_query_port(&mut self, port: u16) {
        self.conn.set_target_port(port);
    }

    pub fn query_port(&self) -> Option<u16> {
        self.conn.target_port()
    }

    /// Whether a connection is currently cached.
    pub fn is_connected(&self) -> bool {
        self.conn.connected_port().is_some()
    }

    pub fn get_coordinator(&self, id: NodeId) -> Option<&CoordinatorState> {
        self.coordinators.get(&id)
    }

    pub fn get_worker(&self, id: NodeId) -> Option<&WorkerState> {
        self.workers.get(&id)
    }

    pub fn coordinators(&self) -> &HashMap<NodeId, CoordinatorState> {
        &self.coordinators
    }

    pub fn workers(&self) -> &HashMap<NodeId, WorkerState> {
        &self.workers
    }

    /// The coordinator currently believed to be the alive master.
    pub fn master(&self) -> Option<&CoordinatorState> {
        self.coordinators.values().find(|c| c.is_master && c.alive)
    }

    /// Release the connection.
    pub async fn close(mut self) {
        self.conn.close().await;
    }

    pub(crate) async fn execute(&mut self, sql: &str) -> AdminResult<ResultSet> {
        self.conn.query(sql).await
    }
}
