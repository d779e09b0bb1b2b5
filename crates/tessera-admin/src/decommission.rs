//! Decommission workflow: graceful removal of a worker.
//!
//! ```text
//! NotStarted ──► Decommissioning ──► Completed
//!      │               │
//!      └───────────────┴──────────► Failed
//! ```
//!
//! The worker is marked for decommission, then worker states are polled at
//! a fixed interval until the worker disappears from the cluster. There is
//! no upper bound on the number of polls: callers bound the wait through
//! the cancel signal (or by dropping the future). Any error during a poll
//! fails the workflow immediately.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, Instrument};

use tessera_core::{NodeEndpoint, NodeId};

use crate::classify::OperationKind;
use crate::client::AdminClient;
use crate::error::{AdminError, AdminResult};
use crate::statements;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecommissionPhase {
    NotStarted,
    Decommissioning,
    Completed,
    Failed,
}

/// How a successful decommission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecommissionOutcome {
    /// The worker migrated its tablets and left the cluster.
    Drained,
    /// The cluster did not know the worker when the command was issued.
    AlreadyRemoved,
}

/// One progress observation while the worker is still present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecommissionProgress {
    pub node_id: NodeId,
    pub endpoint: NodeEndpoint,
    pub poll: u32,
    pub alive: bool,
    pub decommissioned: bool,
    pub remaining_tablets: u64,
    pub original_tablets: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecommissionReport {
    pub node_id: NodeId,
    pub endpoint: NodeEndpoint,
    pub outcome: DecommissionOutcome,
    /// Tablets on the worker before the decommission started.
    pub original_tablets: u64,
    /// Worker-state reloads after the command was issued.
    pub polls: u32,
    pub elapsed: Duration,
}

pub type ProgressCallback = Box<dyn FnMut(&DecommissionProgress) + Send>;

/// A pending decommission of one worker. Built by
/// [`AdminClient::decommission_worker`], started with [`Decommission::run`].
pub struct Decommission<'a> {
    client: &'a mut AdminClient,
    endpoint: NodeEndpoint,
    phase: DecommissionPhase,
    cancel: Option<watch::Receiver<bool>>,
    on_progress: Option<ProgressCallback>,
}

impl AdminClient {
    pub fn decommission_worker(&mut self, endpoint: &NodeEndpoint) -> Decommission<'_> {
        Decommission {
            client: self,
            endpoint: *endpoint,
            phase: DecommissionPhase::NotStarted,
            cancel: None,
            on_progress: None,
        }
    }
}

impl<'a> Decommission<'a> {
    /// Abort the poll loop once `cancel` turns `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn phase(&self) -> DecommissionPhase {
        self.phase
    }

    /// Drive the workflow to completion or failure.
    pub async fn run(&mut self) -> AdminResult<DecommissionReport> {
        let span = self.client.span.clone();
        let result = self.drive().instrument(span).await;
        self.phase = match result {
            Ok(_) => DecommissionPhase::Completed,
            Err(_) => DecommissionPhase::Failed,
        };
        debug!(endpoint = %self.endpoint, phase = ?self.phase, "decommission finished");
        result
    }

    async fn drive(&mut self) -> AdminResult<DecommissionReport> {
        let endpoint = self.endpoint;
        let id = endpoint.node_id();
        let start = Instant::now();

        if self.client.get_worker(id).is_none() {
            self.client
                .load_worker_states()
                .await
                .map_err(|e| e.acting_on(endpoint))?;
        }
        let mut original_tablets = 0;
        if let Some(be) = self.client.get_worker(id) {
            original_tablets = be.tablet_num;
            if !be.alive {
                return Err(AdminError::Precondition(format!(
                    "cannot decommission worker {endpoint} with id {id}: it is not alive, \
                     use a forced drop to remove it instead"
                )));
            }
        }

        match self.client.execute(&statements::decommission_backend(&endpoint)).await {
            Ok(_) => {
                info!(%endpoint, %id, original_tablets, "worker marked as decommissioned, waiting for tablet migration");
            }
            Err(e) if self.client.is_not_found(&e, OperationKind::DecommissionWorker) => {
                info!(%endpoint, %id, "worker not in cluster, decommission is a no-op");
                return Ok(DecommissionReport {
                    node_id: id,
                    endpoint,
                    outcome: DecommissionOutcome::AlreadyRemoved,
                    original_tablets,
                    polls: 0,
                    elapsed: start.elapsed(),
                });
            }
            Err(e) => return Err(e.acting_on(endpoint)),
        }
        self.phase = DecommissionPhase::Decommissioning;

        let mut polls = 0u32;
        loop {
            self.client
                .load_worker_states()
                .await
                .map_err(|e| e.acting_on(endpoint))?;
            polls += 1;

            let Some(be) = self.client.get_worker(id) else {
                info!(%endpoint, original_tablets, polls, "worker decommissioned and dropped from cluster");
                return Ok(DecommissionReport {
                    node_id: id,
                    endpoint,
                    outcome: DecommissionOutcome::Drained,
                    original_tablets,
                    polls,
                    elapsed: start.elapsed(),
                });
            };

            let progress = DecommissionProgress {
                node_id: id,
                endpoint,
                poll: polls,
                alive: be.alive,
                decommissioned: be.decommissioned,
                remaining_tablets: be.tablet_num,
                original_tablets,
                elapsed: start.elapsed(),
            };
            info!(
                %endpoint,
                alive = progress.alive,
                decommissioned = progress.decommissioned,
                "migrating tablets, {}/{} left, {}s elapsed",
                progress.remaining_tablets,
                progress.original_tablets,
                progress.elapsed.as_secs()
            );
            if let Some(cb) = self.on_progress.as_mut() {
                cb(&progress);
            }

            let interval = self.client.poll_interval;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancelled(&mut self.cancel) => {
                    return Err(AdminError::Cancelled(format!("decommission of worker {endpoint}")));
                }
            }
        }
    }
}

/// Resolves once the cancel signal reads `true`. Never resolves without a
/// signal, or after its sender is gone.
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
