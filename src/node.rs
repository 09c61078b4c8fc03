//! Storage node model
//!
//! The remote hierarchical storage service is the single source of truth
//! for DOI records: a DOI is a container node whose properties carry the
//! record fields and whose access-control lists gate visibility. Container
//! and data nodes share one `Node` type, matching the whole-node update
//! semantics of the storage collaborator.

use crate::errors::{DoiError, DoiResult};
use crate::identifiers::GroupRef;
use crate::status::DoiStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Access-control lists attached to a node
///
/// ACLs are recomputed whole on every status transition, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Groups with read-only access
    pub read_only: BTreeSet<GroupRef>,
    /// Groups with read-write access
    pub read_write: BTreeSet<GroupRef>,
    /// Whether the node is publicly visible
    pub is_public: bool,
}

impl Acl {
    /// No groups, not public
    pub fn private() -> Self {
        Self::default()
    }

    /// No groups, publicly visible; the shape applied when a DOI is minted
    pub fn public() -> Self {
        Self {
            read_only: BTreeSet::new(),
            read_write: BTreeSet::new(),
            is_public: true,
        }
    }

    /// Not public, with the given groups read-only
    pub fn read_only(groups: impl IntoIterator<Item = GroupRef>) -> Self {
        Self {
            read_only: groups.into_iter().collect(),
            read_write: BTreeSet::new(),
            is_public: false,
        }
    }

    /// Not public, with the given groups read-write
    pub fn read_write(groups: impl IntoIterator<Item = GroupRef>) -> Self {
        Self {
            read_only: BTreeSet::new(),
            read_write: groups.into_iter().collect(),
            is_public: false,
        }
    }
}

/// Record fields persisted as node properties on the DOI container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    /// Lifecycle status token
    Status,
    /// Citation title, kept in sync with the metadata document
    Title,
    /// Principal that created the DOI
    Requester,
    /// Optional journal reference
    JournalRef,
    /// Reviewer identity; settable only by publishers and admins
    Reviewer,
    /// Handle of the outstanding data-lock job, present while locking
    JobRef,
}

impl PropertyKey {
    /// The persisted property name
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Status => "status",
            PropertyKey::Title => "title",
            PropertyKey::Requester => "requester",
            PropertyKey::JournalRef => "journal_ref",
            PropertyKey::Reviewer => "reviewer",
            PropertyKey::JobRef => "job_ref",
        }
    }
}

/// Node flavor in the hierarchical store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Holds child nodes and record properties
    Container,
    /// Holds opaque content (the metadata document)
    Data,
}

/// A node in the hierarchical storage service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    kind: NodeKind,
    /// Record properties
    pub properties: BTreeMap<PropertyKey, String>,
    /// Access-control lists
    pub acl: Acl,
    /// Child node names; containers only
    pub children: Vec<String>,
    /// Whether the node (and, once propagated, its descendants) is locked
    /// against modification
    pub locked: bool,
}

impl Node {
    /// Create an empty container node
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Container,
            properties: BTreeMap::new(),
            acl: Acl::private(),
            children: Vec::new(),
            locked: false,
        }
    }

    /// Create an empty data node
    pub fn data(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Data,
            properties: BTreeMap::new(),
            acl: Acl::private(),
            children: Vec::new(),
            locked: false,
        }
    }

    /// Node name (the last path segment)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node flavor
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Look up a property value
    pub fn property(&self, key: PropertyKey) -> Option<&str> {
        self.properties.get(&key).map(String::as_str)
    }

    /// Insert or replace a property
    pub fn set_property(&mut self, key: PropertyKey, value: impl Into<String>) {
        self.properties.insert(key, value.into());
    }

    /// Remove a property if present
    pub fn remove_property(&mut self, key: PropertyKey) {
        self.properties.remove(&key);
    }

    /// Parse the status property
    pub fn status(&self) -> DoiResult<DoiStatus> {
        let value = self
            .property(PropertyKey::Status)
            .ok_or_else(|| DoiError::NotFound(format!("status property on node {}", self.name)))?;
        DoiStatus::parse(value)
    }

    /// Replace the status property
    pub fn set_status(&mut self, status: DoiStatus) {
        self.set_property(PropertyKey::Status, status.as_str());
    }
}
