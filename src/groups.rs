//! Group-management collaborator
//!
//! Each DOI gets its own administration group at creation time: the
//! requester is its only member and admin. The service is external; only
//! group creation is consumed by this crate.

use crate::errors::DoiError;
use crate::identifiers::{GroupRef, Principal};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the group-management collaborator
#[derive(Debug, Clone, Error)]
pub enum GroupError {
    /// A group with that name already exists
    #[error("group already exists: {0}")]
    AlreadyExists(String),

    /// Any other group-service failure
    #[error("group service failure: {0}")]
    Failed(String),
}

impl From<GroupError> for DoiError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::AlreadyExists(name) => DoiError::AlreadyExists(name),
            GroupError::Failed(message) => DoiError::Remote {
                service: "group-service".to_string(),
                message,
            },
        }
    }
}

/// Narrow interface to the group-management service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Create a group with the given members and admins
    async fn create_group(
        &self,
        name: &str,
        members: Vec<Principal>,
        admins: Vec<Principal>,
    ) -> Result<GroupRef, GroupError>;
}

/// In-memory group service for tests
#[derive(Debug, Default)]
pub struct InMemoryGroups {
    groups: RwLock<BTreeMap<String, (Vec<Principal>, Vec<Principal>)>>,
}

impl InMemoryGroups {
    /// Empty group service
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of a group, if it exists
    pub async fn members(&self, name: &str) -> Option<Vec<Principal>> {
        self.groups
            .read()
            .await
            .get(name)
            .map(|(members, _)| members.clone())
    }
}

#[async_trait]
impl GroupService for InMemoryGroups {
    async fn create_group(
        &self,
        name: &str,
        members: Vec<Principal>,
        admins: Vec<Principal>,
    ) -> Result<GroupRef, GroupError> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(name) {
            return Err(GroupError::AlreadyExists(name.to_string()));
        }
        groups.insert(name.to_string(), (members, admins));
        Ok(GroupRef::new(name))
    }
}
