//! The minting pipeline
//!
//! A state-driven dispatcher that walks a DOI from `draft` through
//! `locking_data`, `locked_data`, `registering`, and finally `minted`.
//! Re-entry is idempotent: every call dispatches on the current status, and
//! in-flight or terminal states are no-ops. Each externally-visible state
//! change is persisted before the remote call it describes, so a crash
//! mid-operation leaves the record in an `error_*` or in-progress state
//! that is safe to retry.

use crate::config::DoiConfig;
use crate::errors::{DoiError, DoiResult};
use crate::identifiers::{DoiSuffix, JobRef};
use crate::node::{Acl, Node, PropertyKey};
use crate::registrar::Registrar;
use crate::resource::{doi_filename, MetadataCodec};
use crate::status::DoiStatus;
use crate::storage::StorageService;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Outstanding data-lock jobs, for best-effort cancellation at shutdown
///
/// The pipeline never waits on or polls the recursive lock job; it only
/// remembers the handle so a graceful shutdown can ask the storage service
/// to cancel it.
#[derive(Debug, Default)]
pub struct JobCancellations {
    outstanding: Mutex<Vec<JobRef>>,
}

impl JobCancellations {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an outstanding job
    pub fn register(&self, job: JobRef) {
        self.outstanding.lock().expect("registry poisoned").push(job);
    }

    /// Currently tracked jobs
    pub fn outstanding(&self) -> Vec<JobRef> {
        self.outstanding.lock().expect("registry poisoned").clone()
    }

    /// Remove and return all tracked jobs
    pub fn take_all(&self) -> Vec<JobRef> {
        std::mem::take(&mut *self.outstanding.lock().expect("registry poisoned"))
    }
}

/// Drives a DOI through the lock / register / publish stages
pub struct MintingPipeline {
    storage: Arc<dyn StorageService>,
    registrar: Arc<dyn Registrar>,
    codec: Arc<dyn MetadataCodec>,
    config: DoiConfig,
    cancellations: Arc<JobCancellations>,
}

impl MintingPipeline {
    /// Build a pipeline over the given collaborators
    pub fn new(
        storage: Arc<dyn StorageService>,
        registrar: Arc<dyn Registrar>,
        codec: Arc<dyn MetadataCodec>,
        config: DoiConfig,
        cancellations: Arc<JobCancellations>,
    ) -> Self {
        Self {
            storage,
            registrar,
            codec,
            config,
            cancellations,
        }
    }

    /// Dispatch one mint attempt based on the DOI's current status
    ///
    /// Returns the status after the attempt. States with work in flight
    /// (`locking_data`, `registering`) and pipeline-terminal states are
    /// no-ops; so is any review-workflow state, since review and minting
    /// are orthogonal tracks.
    pub async fn advance(&self, suffix: &DoiSuffix) -> DoiResult<DoiStatus> {
        let container = self.storage.get_node(suffix.as_str()).await?;
        let status = container.status()?;

        match status {
            DoiStatus::Draft | DoiStatus::ErrorLockingData => {
                self.lock_data(suffix, container).await
            }
            DoiStatus::LockedData | DoiStatus::ErrorRegistering => {
                self.register(suffix, container).await
            }
            other => {
                debug!(%suffix, status = %other, "mint attempt is a no-op in this status");
                Ok(other)
            }
        }
    }

    /// Lock stage: mark the data area public and locked, then start the
    /// asynchronous recursive propagation job without waiting for it
    async fn lock_data(&self, suffix: &DoiSuffix, mut container: Node) -> DoiResult<DoiStatus> {
        let container_path = suffix.as_str();

        container.set_status(DoiStatus::LockingData);
        match self.try_lock_data(suffix, &mut container).await {
            Ok(job) => {
                info!(%suffix, %job, "data lock job started");
                Ok(DoiStatus::LockingData)
            }
            Err(err) => {
                warn!(%suffix, error = %err, "data lock failed, reverting");
                container.set_status(DoiStatus::ErrorLockingData);
                container.remove_property(PropertyKey::JobRef);
                if let Err(compensation) = self
                    .storage
                    .set_node(container_path, container)
                    .await
                {
                    warn!(%suffix, error = %compensation, "lock compensation failed");
                }
                Err(err)
            }
        }
    }

    async fn try_lock_data(&self, suffix: &DoiSuffix, container: &mut Node) -> DoiResult<JobRef> {
        let container_path = suffix.as_str();
        let data_path = format!("{}/data", suffix.as_str());

        self.storage
            .set_node(container_path, container.clone())
            .await?;

        let mut data = self.storage.get_node(&data_path).await?;
        data.acl = Acl::public();
        data.locked = true;
        // drop the child listing; the recursive job payload must not carry
        // the whole subtree
        data.children.clear();
        self.storage.set_node(&data_path, data.clone()).await?;

        // fire and forget; completion is observed by a later poll, not here
        let job = self
            .storage
            .create_recursive_property_job(&data_path, data)
            .await?;
        self.cancellations.register(job.clone());

        container.set_property(PropertyKey::JobRef, job.as_str());
        self.storage
            .set_node(container_path, container.clone())
            .await?;
        Ok(job)
    }

    /// Register stage: post the metadata document to the registrar, make
    /// the DOI findable, then expose the record publicly
    async fn register(&self, suffix: &DoiSuffix, mut container: Node) -> DoiResult<DoiStatus> {
        let container_path = suffix.as_str();
        let document_path = format!("{}/{}", suffix.as_str(), doi_filename(suffix.as_str()));
        let acl_snapshot = container.acl.clone();

        container.set_status(DoiStatus::Registering);
        self.storage
            .set_node(container_path, container.clone())
            .await?;

        let mut document_acl_snapshot: Option<Acl> = None;
        match self
            .try_register(suffix, &mut container, &document_path, &mut document_acl_snapshot)
            .await
        {
            Ok(()) => {
                info!(%suffix, "DOI minted");
                Ok(DoiStatus::Minted)
            }
            Err(err) => {
                warn!(%suffix, error = %err, "registration failed, restoring ACLs");
                if let Some(original) = document_acl_snapshot {
                    match self.storage.get_node(&document_path).await {
                        Ok(mut document) => {
                            document.acl = original;
                            if let Err(compensation) =
                                self.storage.set_node(&document_path, document).await
                            {
                                warn!(%suffix, error = %compensation, "document ACL restore failed");
                            }
                        }
                        Err(compensation) => {
                            warn!(%suffix, error = %compensation, "document ACL restore failed");
                        }
                    }
                }
                container.set_status(DoiStatus::ErrorRegistering);
                container.acl = acl_snapshot;
                if let Err(compensation) = self
                    .storage
                    .set_node(container_path, container)
                    .await
                {
                    warn!(%suffix, error = %compensation, "register compensation failed");
                }
                Err(err)
            }
        }
    }

    async fn try_register(
        &self,
        suffix: &DoiSuffix,
        container: &mut Node,
        document_path: &str,
        document_acl_snapshot: &mut Option<Acl>,
    ) -> DoiResult<()> {
        let bytes = self.storage.get_document(document_path).await?;
        // decode and re-encode so a corrupt stored document is caught here,
        // not by the registrar
        let resource = self.codec.deserialize(&bytes)?;
        let body = self.codec.serialize(&resource)?;

        debug!(%suffix, bytes = body.len(), "posting metadata to registrar");
        self.registrar
            .register_metadata(&self.config.account_prefix, suffix.as_str(), body)
            .await
            .map_err(DoiError::from)?;

        let landing_page = self.config.landing_page(suffix.as_str());
        self.registrar
            .set_landing_page(&self.config.account_prefix, suffix.as_str(), &landing_page)
            .await
            .map_err(DoiError::from)?;

        // the landing page must resolve anonymously; strip group access and
        // publish both the document node and the container
        let mut document = self.storage.get_node(document_path).await?;
        *document_acl_snapshot = Some(document.acl.clone());
        document.acl = Acl::public();
        self.storage.set_node(document_path, document).await?;

        container.set_status(DoiStatus::Minted);
        container.acl = Acl::public();
        self.storage
            .set_node(suffix.as_str(), container.clone())
            .await?;
        Ok(())
    }
}
