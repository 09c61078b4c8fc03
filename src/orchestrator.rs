//! The DOI lifecycle orchestrator
//!
//! `DoiService` composes the allocator, state machine, merger, and minting
//! pipeline over the storage, group, and registrar collaborators. It owns
//! the authorization gates and the suffix reservation loop; everything
//! below it is a pure function or a single remote call.

use crate::allocator::IdentifierAllocator;
use crate::config::DoiConfig;
use crate::errors::{DoiError, DoiResult};
use crate::groups::GroupService;
use crate::identifiers::{DoiSuffix, GroupRef, Principal};
use crate::merge;
use crate::minting::{JobCancellations, MintingPipeline};
use crate::node::{Node, PropertyKey};
use crate::policy::{self, RoleSet};
use crate::registrar::Registrar;
use crate::resource::{doi_filename, DateEvent, DateType, Identifier, MetadataCodec, Resource};
use crate::search::{self, DoiListing, SearchContext, SearchFilter};
use crate::state_machine::StateMachine;
use crate::status::DoiStatus;
use crate::storage::{StorageError, StorageService};
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The authenticated caller of an orchestrator operation
///
/// Publisher and admin standing come from the deployment's group
/// memberships and are resolved before the call; requester standing is
/// per-DOI and computed against the record's requester property.
#[derive(Debug, Clone)]
pub struct Caller {
    principal: Principal,
    publisher: bool,
    admin: bool,
}

impl Caller {
    /// A caller with no publisher or admin standing
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            publisher: false,
            admin: false,
        }
    }

    /// Mark the caller as a publisher group member
    pub fn as_publisher(mut self) -> Self {
        self.publisher = true;
        self
    }

    /// Mark the caller as a service administrator
    pub fn as_admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// The caller's principal
    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// An edit to one optional record property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Insert or replace the value
    Set(String),
    /// Delete the property
    Clear,
}

/// The content of an update request; at least one field must be present
#[derive(Debug, Clone, Default)]
pub struct DoiUpdate {
    /// Replacement metadata document, merged onto the stored one
    pub document: Option<Resource>,
    /// Journal reference edit
    pub journal_ref: Option<FieldUpdate>,
    /// Reviewer edit; publishers and admins only
    pub reviewer: Option<FieldUpdate>,
    /// Requested status transition
    pub status: Option<DoiStatus>,
}

impl DoiUpdate {
    fn is_empty(&self) -> bool {
        self.document.is_none()
            && self.journal_ref.is_none()
            && self.reviewer.is_none()
            && self.status.is_none()
    }
}

/// A freshly created DOI
#[derive(Debug, Clone)]
pub struct CreatedDoi {
    /// The allocated suffix
    pub suffix: DoiSuffix,
    /// The stored document, with the assigned identifier and CREATED date
    pub resource: Resource,
}

/// Orchestrates the DOI lifecycle over the service collaborators
pub struct DoiService {
    storage: Arc<dyn StorageService>,
    groups: Arc<dyn GroupService>,
    codec: Arc<dyn MetadataCodec>,
    config: DoiConfig,
    allocator: IdentifierAllocator,
    state_machine: StateMachine,
    pipeline: MintingPipeline,
    cancellations: Arc<JobCancellations>,
}

impl DoiService {
    /// Wire up the orchestrator
    pub fn new(
        storage: Arc<dyn StorageService>,
        groups: Arc<dyn GroupService>,
        registrar: Arc<dyn Registrar>,
        codec: Arc<dyn MetadataCodec>,
        config: DoiConfig,
    ) -> Self {
        let cancellations = Arc::new(JobCancellations::new());
        let allocator = IdentifierAllocator::new(&config);
        let state_machine = StateMachine::new(storage.clone(), config.clone());
        let pipeline = MintingPipeline::new(
            storage.clone(),
            registrar,
            codec.clone(),
            config.clone(),
            cancellations.clone(),
        );
        Self {
            storage,
            groups,
            codec,
            config,
            allocator,
            state_machine,
            pipeline,
            cancellations,
        }
    }

    /// Create a DOI: allocate a suffix, create the per-DOI group, and lay
    /// down the container, metadata document, and data area
    ///
    /// `properties` may carry a journal reference; any other key is a
    /// validation error, since status, title, and requester are owned by
    /// the service at creation.
    pub async fn create_doi(
        &self,
        caller: &Caller,
        resource: Resource,
        properties: BTreeMap<String, String>,
    ) -> DoiResult<CreatedDoi> {
        let title = resource.primary_title()?.value.clone();

        let mut journal_ref = None;
        for (key, value) in properties {
            match key.as_str() {
                "journal_ref" => journal_ref = Some(value),
                other => {
                    return Err(DoiError::validation(format!(
                        "property cannot be set at creation: {other}"
                    )))
                }
            }
        }

        let (suffix, acl) = self
            .reserve_suffix(caller, &title, journal_ref.as_deref())
            .await?;
        let group_name = self.config.doi_group_name(suffix.as_str());

        // members and admins are both just the requester; publishers reach
        // the record through their own standing group
        self.groups
            .create_group(
                &group_name,
                vec![caller.principal.clone()],
                vec![caller.principal.clone()],
            )
            .await?;

        let identifier = Identifier::new(self.config.doi_identifier(suffix.as_str()), "DOI");
        let mut resource = resource.with_identifier(identifier);
        resource.dates.push(DateEvent {
            date: Local::now().format("%Y-%m-%d").to_string(),
            date_type: DateType::Created,
            information: Some("The date the DOI was created".to_string()),
        });

        let document_path = format!("{}/{}", suffix.as_str(), doi_filename(suffix.as_str()));
        let mut document_node = Node::data(doi_filename(suffix.as_str()));
        document_node.acl = acl.clone();
        self.storage.create_node(&document_path, document_node).await?;
        self.storage
            .put_document(&document_path, self.codec.serialize(&resource)?)
            .await?;

        let data_path = format!("{}/data", suffix.as_str());
        let mut data_node = Node::container("data");
        data_node.acl = acl;
        self.storage.create_node(&data_path, data_node).await?;

        info!(%suffix, requester = %caller.principal, "DOI created");
        Ok(CreatedDoi { suffix, resource })
    }

    /// Reserve a suffix by creating its container node; the storage
    /// service's name-uniqueness is the only arbiter under concurrency
    async fn reserve_suffix(
        &self,
        caller: &Caller,
        title: &str,
        journal_ref: Option<&str>,
    ) -> DoiResult<(DoiSuffix, crate::node::Acl)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let base = self.storage.get_node("").await?;
            let suffix = self.allocator.allocate(&base.children)?;

            let doi_group = GroupRef::new(self.config.doi_group_name(suffix.as_str()));
            let acl = policy::initial_acl(&doi_group, self.config.publisher_group.as_ref());

            let mut container = Node::container(suffix.as_str());
            container.set_status(DoiStatus::Draft);
            container.set_property(PropertyKey::Title, title);
            container.set_property(PropertyKey::Requester, caller.principal.as_str());
            if let Some(journal_ref) = journal_ref {
                container.set_property(PropertyKey::JournalRef, journal_ref);
            }
            container.acl = acl.clone();

            match self.storage.create_node(suffix.as_str(), container).await {
                Ok(_) => return Ok((suffix, acl)),
                Err(StorageError::AlreadyExists(_)) => {
                    let conflict = DoiError::AllocationConflict {
                        suffix: suffix.as_str().to_string(),
                    };
                    if attempt >= self.config.max_allocation_attempts {
                        warn!(error = %conflict, attempt, "allocation retries exhausted");
                        return Err(DoiError::AllocationExhausted { attempts: attempt });
                    }
                    debug!(error = %conflict, attempt, "retrying allocation");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Update a DOI's metadata document and/or record properties
    ///
    /// The document path merges the submission onto the stored document,
    /// rejecting immutable-field edits, and keeps the container's title
    /// property in sync. A status edit routes through the state machine so
    /// it lands with the recomputed ACL.
    pub async fn update_doi(
        &self,
        caller: &Caller,
        suffix: &DoiSuffix,
        update: DoiUpdate,
    ) -> DoiResult<()> {
        if update.is_empty() {
            return Err(DoiError::validation("DOI update contains no content"));
        }

        let mut container = self.storage.get_node(suffix.as_str()).await?;
        let current = container.status()?;
        let roles = self.roles_for(caller, &container);
        if !roles.requester && !roles.publisher && !roles.admin {
            return Err(DoiError::authorization(format!(
                "Not authorized to operate on this resource: {suffix}"
            )));
        }
        let mut dirty = false;

        if let Some(submitted) = &update.document {
            let document_path =
                format!("{}/{}", suffix.as_str(), doi_filename(suffix.as_str()));
            let stored = self
                .codec
                .deserialize(&self.storage.get_document(&document_path).await?)?;
            let merged = merge::merge(submitted, stored)?;
            self.storage
                .put_document(&document_path, self.codec.serialize(&merged)?)
                .await?;
            container.set_property(PropertyKey::Title, merged.primary_title()?.value.clone());
            dirty = true;
        }

        if let Some(edit) = &update.journal_ref {
            apply_field(&mut container, PropertyKey::JournalRef, edit);
            dirty = true;
        }

        if let Some(edit) = &update.reviewer {
            if !policy::can_set_reviewer(&roles) {
                return Err(DoiError::authorization(format!(
                    "Not authorized to set the reviewer on this resource: {suffix}"
                )));
            }
            apply_field(&mut container, PropertyKey::Reviewer, edit);
            dirty = true;
        }

        match update.status {
            Some(requested) if requested != current => {
                // pending property edits ride along in the transition's write
                self.state_machine
                    .transition(suffix, container, requested, &roles)
                    .await?;
            }
            _ => {
                if dirty {
                    self.storage.set_node(suffix.as_str(), container).await?;
                }
            }
        }
        Ok(())
    }

    /// Apply one status transition
    pub async fn transition_status(
        &self,
        caller: &Caller,
        suffix: &DoiSuffix,
        requested: DoiStatus,
    ) -> DoiResult<DoiStatus> {
        let container = self.storage.get_node(suffix.as_str()).await?;
        let roles = self.roles_for(caller, &container);
        let node = self
            .state_machine
            .transition(suffix, container, requested, &roles)
            .await?;
        node.status()
    }

    /// Advance the minting pipeline one step
    ///
    /// Admins always may; in review mode only a publisher who is not the
    /// requester may, otherwise the requester or a publisher may.
    pub async fn mint(&self, caller: &Caller, suffix: &DoiSuffix) -> DoiResult<DoiStatus> {
        let container = self.storage.get_node(suffix.as_str()).await?;
        let roles = self.roles_for(caller, &container);

        if !roles.admin {
            if self.config.review_mode {
                if !roles.publisher || roles.requester {
                    return Err(DoiError::authorization(format!(
                        "Not authorized to Mint this resource: {suffix}"
                    )));
                }
            } else if !roles.requester && !roles.publisher {
                return Err(DoiError::authorization(format!(
                    "Not authorized to operate on this resource: {suffix}"
                )));
            }
        }

        self.pipeline.advance(suffix).await
    }

    /// List the DOIs visible to the caller
    pub async fn search(
        &self,
        caller: &Caller,
        filter: &SearchFilter,
    ) -> DoiResult<Vec<DoiListing>> {
        let base = self.storage.get_node("").await?;
        let mut nodes = Vec::with_capacity(base.children.len());
        for name in &base.children {
            nodes.push(self.storage.get_node(name).await?);
        }

        let ctx = SearchContext {
            caller: caller.principal.clone(),
            admin: caller.admin,
            publisher: caller.publisher,
            publisher_group_configured: self.config.publisher_group.is_some(),
        };
        search::filter_records(nodes, &ctx, filter)
    }

    /// Request cancellation of outstanding data-lock jobs; best-effort
    pub async fn shutdown(&self) {
        for job in self.cancellations.take_all() {
            if let Err(err) = self.storage.cancel_job(&job).await {
                warn!(%job, error = %err, "job cancellation failed");
            }
        }
    }

    fn roles_for(&self, caller: &Caller, container: &Node) -> RoleSet {
        RoleSet {
            requester: container.property(PropertyKey::Requester)
                == Some(caller.principal.as_str()),
            publisher: caller.publisher,
            admin: caller.admin,
        }
    }
}

fn apply_field(container: &mut Node, key: PropertyKey, edit: &FieldUpdate) {
    match edit {
        FieldUpdate::Set(value) => container.set_property(key, value.clone()),
        FieldUpdate::Clear => container.remove_property(key),
    }
}
