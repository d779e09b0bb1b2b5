//! Membership operator: add/drop nodes and bootstrap the storage vault.

use tracing::{error, info, Instrument};

use tessera_core::{CloudStoreConfig, NodeEndpoint};

use crate::classify::OperationKind;
use crate::client::AdminClient;
use crate::error::AdminResult;
use crate::statements;

impl AdminClient {
    /// Register a coordinator as a follower.
    pub async fn add_coordinator(&mut self, endpoint: &NodeEndpoint) -> AdminResult<()> {
        self.add_member(endpoint, "coordinator", statements::add_follower(endpoint))
            .await
    }

    /// Remove a coordinator. A coordinator the cluster no longer knows
    /// counts as removed.
    pub async fn drop_coordinator(&mut self, endpoint: &NodeEndpoint) -> AdminResult<()> {
        self.drop_member(
            endpoint,
            OperationKind::DropCoordinator,
            statements::drop_follower(endpoint),
        )
        .await
    }

    /// Register a worker.
    pub async fn add_worker(&mut self, endpoint: &NodeEndpoint) -> AdminResult<()> {
        self.add_member(endpoint, "worker", statements::add_backend(endpoint))
            .await
    }

    /// Force-remove a worker without migrating its tablets. A worker the
    /// cluster no longer knows counts as removed.
    pub async fn drop_worker(&mut self, endpoint: &NodeEndpoint) -> AdminResult<()> {
        self.drop_member(
            endpoint,
            OperationKind::DropWorker,
            statements::drop_backend(endpoint),
        )
        .await
    }

    /// Create the S3-backed storage vault and make it the cluster default.
    ///
    /// Each call scopes the vault under a freshly generated root path.
    /// A vault created before the second statement fails is left in place.
    pub async fn create_default_storage_vault(
        &mut self,
        config: &CloudStoreConfig,
    ) -> AdminResult<()> {
        let span = self.span.clone();
        async {
            let root_path = uuid::Uuid::new_v4().to_string();
            let vault = config.vault_name.as_str();

            let result = async {
                self.execute(&statements::create_s3_vault(config, &root_path))
                    .await?;
                info!(%vault, %root_path, bucket = %config.bucket, "created storage vault");

                self.execute(&statements::set_default_vault(vault)).await?;
                info!(%vault, "set default storage vault");
                Ok::<(), crate::AdminError>(())
            }
            .await;

            if let Err(e) = &result {
                error!(%vault, error = %e, "failed to create default storage vault");
            }
            result.map_err(|e| e.acting_on(format!("storage vault {vault}")))
        }
        .instrument(span)
        .await
    }

    async fn add_member(
        &mut self,
        endpoint: &NodeEndpoint,
        role: &'static str,
        sql: String,
    ) -> AdminResult<()> {
        let span = self.span.clone();
        async {
            match self.execute(&sql).await {
                Ok(_) => {
                    info!(%endpoint, id = %endpoint.node_id(), role, "added member");
                    Ok(())
                }
                Err(e) => {
                    error!(%endpoint, id = %endpoint.node_id(), role, error = %e, "failed to add member");
                    Err(e.acting_on(endpoint))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drop_member(
        &mut self,
        endpoint: &NodeEndpoint,
        kind: OperationKind,
        sql: String,
    ) -> AdminResult<()> {
        let span = self.span.clone();
        async {
            let id = endpoint.node_id();
            match self.execute(&sql).await {
                Ok(_) => {
                    info!(%endpoint, %id, ?kind, "dropped member");
                    Ok(())
                }
                Err(e) if self.is_not_found(&e, kind) => {
                    info!(%endpoint, %id, ?kind, "member already absent, drop is a no-op");
                    Ok(())
                }
                Err(e) => Err(e.acting_on(endpoint)),
            }
        }
        .instrument(span)
        .await
    }

    pub(crate) fn is_not_found(&self, err: &crate::AdminError, kind: OperationKind) -> bool {
        err.cluster_message()
            .is_some_and(|msg| self.classifier.is_idempotent_not_found(msg, kind))
    }
}
