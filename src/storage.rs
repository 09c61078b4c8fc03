//! Hierarchical storage collaborator
//!
//! The storage service is the single source of truth and the only
//! synchronization point between requests. `create_node` fails when the
//! target name already exists, which the orchestrator uses as the effective
//! compare-and-set for suffix reservation. Node updates are whole-node and
//! last-writer-wins; there is no compare-and-swap.

use crate::errors::DoiError;
use crate::identifiers::JobRef;
use crate::node::Node;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the storage collaborator
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The target node name is already taken
    #[error("node already exists: {0}")]
    AlreadyExists(String),

    /// No node at the given path
    #[error("node not found: {0}")]
    NotFound(String),

    /// Any other storage failure
    #[error("storage failure: {0}")]
    Failed(String),
}

impl From<StorageError> for DoiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(path) => DoiError::AlreadyExists(path),
            StorageError::NotFound(path) => DoiError::NotFound(path),
            StorageError::Failed(message) => DoiError::Remote {
                service: "storage".to_string(),
                message,
            },
        }
    }
}

/// Narrow interface to the remote hierarchical storage service
///
/// Paths are relative to the DOI base container; the empty path addresses
/// the base container itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Create a node; fails with [`StorageError::AlreadyExists`] when the
    /// name is taken
    async fn create_node(&self, path: &str, node: Node) -> Result<Node, StorageError>;

    /// Fetch a node
    async fn get_node(&self, path: &str) -> Result<Node, StorageError>;

    /// Whole-node update
    async fn set_node(&self, path: &str, node: Node) -> Result<Node, StorageError>;

    /// Start the long-running recursive property propagation job rooted at
    /// `path`; returns immediately with a cancellable handle
    async fn create_recursive_property_job(
        &self,
        path: &str,
        node: Node,
    ) -> Result<JobRef, StorageError>;

    /// Request best-effort cancellation of an outstanding job
    async fn cancel_job(&self, job: &JobRef) -> Result<(), StorageError>;

    /// Fetch the content of a data node
    async fn get_document(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Store the content of a data node
    async fn put_document(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// In-memory storage for tests
///
/// Maintains parent child-listings on `create_node` and keeps started and
/// cancelled jobs observable for assertions.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    nodes: RwLock<BTreeMap<String, Node>>,
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
    started_jobs: RwLock<Vec<(JobRef, String)>>,
    cancelled_jobs: RwLock<Vec<JobRef>>,
    fail_recursive_job: AtomicBool,
}

impl InMemoryStorage {
    /// Empty store with a base container at the root path
    pub fn new() -> Self {
        let storage = Self::default();
        storage
            .nodes
            .try_write()
            .expect("unshared at construction")
            .insert(String::new(), Node::container(""));
        storage
    }

    /// Make the next `create_recursive_property_job` call fail
    pub fn fail_recursive_job(&self, fail: bool) {
        self.fail_recursive_job.store(fail, Ordering::SeqCst);
    }

    /// Jobs started so far, with the paths they were rooted at
    pub async fn started_jobs(&self) -> Vec<(JobRef, String)> {
        self.started_jobs.read().await.clone()
    }

    /// Jobs cancelled so far
    pub async fn cancelled_jobs(&self) -> Vec<JobRef> {
        self.cancelled_jobs.read().await.clone()
    }

    /// Insert a node without listing it under its parent; simulates a
    /// concurrent reservation that the caller's sibling read never saw
    pub async fn create_node_detached(&self, path: &str, node: Node) -> Result<(), StorageError> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        nodes.insert(path.to_string(), node);
        Ok(())
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn create_node(&self, path: &str, node: Node) -> Result<Node, StorageError> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = nodes.get_mut(Self::parent_of(path)) {
            parent.children.push(node.name().to_string());
        }
        nodes.insert(path.to_string(), node.clone());
        Ok(node)
    }

    async fn get_node(&self, path: &str) -> Result<Node, StorageError> {
        self.nodes
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn set_node(&self, path: &str, node: Node) -> Result<Node, StorageError> {
        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        nodes.insert(path.to_string(), node.clone());
        Ok(node)
    }

    async fn create_recursive_property_job(
        &self,
        path: &str,
        _node: Node,
    ) -> Result<JobRef, StorageError> {
        if self.fail_recursive_job.load(Ordering::SeqCst) {
            return Err(StorageError::Failed(format!(
                "recursive property job rejected for {path}"
            )));
        }
        let job = JobRef::random();
        self.started_jobs
            .write()
            .await
            .push((job.clone(), path.to_string()));
        Ok(job)
    }

    async fn cancel_job(&self, job: &JobRef) -> Result<(), StorageError> {
        self.cancelled_jobs.write().await.push(job.clone());
        Ok(())
    }

    async fn get_document(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.documents
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn put_document(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.documents.write().await.insert(path.to_string(), bytes);
        Ok(())
    }
}
