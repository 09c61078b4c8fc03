//! Status transition execution
//!
//! Validates a single requested status change against the permission policy
//! and persists the outcome. Status and the recomputed ACL land in one
//! `set_node` call so no observer sees a half-applied transition.

use crate::config::DoiConfig;
use crate::errors::DoiResult;
use crate::identifiers::{DoiSuffix, GroupRef};
use crate::node::Node;
use crate::policy::{self, RoleSet};
use crate::status::DoiStatus;
use crate::storage::StorageService;
use std::sync::Arc;
use tracing::info;

/// Executes status transitions against the storage collaborator
pub struct StateMachine {
    storage: Arc<dyn StorageService>,
    config: DoiConfig,
}

impl StateMachine {
    /// Build a state machine over the given storage service
    pub fn new(storage: Arc<dyn StorageService>, config: DoiConfig) -> Self {
        Self { storage, config }
    }

    /// Apply one requested transition to a DOI's container node
    ///
    /// A request equal to the current status is a no-op that persists
    /// nothing. Otherwise the permission policy decides legality; on
    /// success the node comes back with the new status and ACL already
    /// persisted.
    pub async fn transition(
        &self,
        suffix: &DoiSuffix,
        mut container: Node,
        requested: DoiStatus,
        roles: &RoleSet,
    ) -> DoiResult<Node> {
        let current = container.status()?;
        let doi_group = GroupRef::new(self.config.doi_group_name(suffix.as_str()));

        let Some(acl) = policy::evaluate(
            current,
            requested,
            roles,
            self.config.review_mode,
            &doi_group,
            self.config.publisher_group.as_ref(),
        )?
        else {
            return Ok(container);
        };

        container.set_status(requested);
        container.acl = acl;
        let persisted = self.storage.set_node(suffix.as_str(), container).await?;

        info!(%suffix, from = %current, to = %requested, "status transition applied");
        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DoiError;
    use crate::node::Acl;
    use crate::storage::InMemoryStorage;

    fn config() -> DoiConfig {
        let mut config = DoiConfig::new("10.11570", "https://example.org/citation");
        config.review_mode = true;
        config.publisher_group = Some(GroupRef::new("publishers"));
        config
    }

    async fn seeded(status: DoiStatus) -> (Arc<InMemoryStorage>, DoiSuffix, Node) {
        let storage = Arc::new(InMemoryStorage::new());
        let suffix = DoiSuffix::new("25.0001").unwrap();
        let mut node = Node::container("25.0001");
        node.set_status(status);
        node.acl = Acl::read_write([GroupRef::new("doi-25.0001")]);
        storage.create_node("25.0001", node.clone()).await.unwrap();
        (storage, suffix, node)
    }

    #[tokio::test]
    async fn test_transition_persists_status_and_acl_together() {
        let (storage, suffix, node) = seeded(DoiStatus::Draft).await;
        let machine = StateMachine::new(storage.clone(), config());

        machine
            .transition(&suffix, node, DoiStatus::ReviewReady, &RoleSet::requester())
            .await
            .unwrap();

        let persisted = storage.get_node("25.0001").await.unwrap();
        assert_eq!(persisted.status().unwrap(), DoiStatus::ReviewReady);
        assert!(persisted.acl.read_write.is_empty());
        assert!(persisted.acl.read_only.contains(&GroupRef::new("doi-25.0001")));
        assert!(persisted.acl.read_only.contains(&GroupRef::new("publishers")));
    }

    #[tokio::test]
    async fn test_noop_transition_persists_nothing() {
        let (storage, suffix, mut node) = seeded(DoiStatus::Draft).await;
        let machine = StateMachine::new(storage.clone(), config());

        // local mutation that a persist would make visible
        node.set_property(crate::node::PropertyKey::Title, "scratch");
        let returned = machine
            .transition(&suffix, node, DoiStatus::Draft, &RoleSet::none())
            .await
            .unwrap();
        assert_eq!(returned.property(crate::node::PropertyKey::Title), Some("scratch"));

        let persisted = storage.get_node("25.0001").await.unwrap();
        assert_eq!(persisted.property(crate::node::PropertyKey::Title), None);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected_and_unpersisted() {
        let (storage, suffix, node) = seeded(DoiStatus::Draft).await;
        let machine = StateMachine::new(storage.clone(), config());

        let err = machine
            .transition(&suffix, node, DoiStatus::Minted, &RoleSet::admin())
            .await
            .unwrap_err();
        assert!(matches!(err, DoiError::InvalidStateTransition { .. }));

        let persisted = storage.get_node("25.0001").await.unwrap();
        assert_eq!(persisted.status().unwrap(), DoiStatus::Draft);
    }

    #[tokio::test]
    async fn test_review_mode_off_rejects_review_transitions() {
        let (storage, suffix, node) = seeded(DoiStatus::Draft).await;
        let mut config = config();
        config.review_mode = false;
        let machine = StateMachine::new(storage, config);

        let err = machine
            .transition(&suffix, node, DoiStatus::ReviewReady, &RoleSet::admin())
            .await
            .unwrap_err();
        assert!(matches!(err, DoiError::InvalidStateTransition { .. }));
    }
}
