//! # DOI Domain
//!
//! DOI (Digital Object Identifier) lifecycle orchestration for a data
//! archive: allocation, review workflow, and minting against an external
//! registrar.
//!
//! The crate provides the building blocks of the lifecycle:
//! - **IdentifierAllocator**: year-scoped `YY.NNNN` suffix counters
//! - **StateMachine**: role- and state-gated status transitions with
//!   whole-ACL recomputation
//! - **ResourceMerger**: metadata updates with immutable-field enforcement
//! - **MintingPipeline**: lock / register / publish with compensating
//!   rollback
//! - **DoiService**: the orchestrator composing all of the above over the
//!   storage, group-management, and registrar collaborators
//!
//! ## Design Principles
//!
//! 1. **Storage is the source of truth**: a DOI record is the property set
//!    and ACL of its container node; there is no second store to drift
//! 2. **Reservation by creation**: suffix uniqueness rides on the storage
//!    service's name uniqueness, not on local locking
//! 3. **Visibility through ACLs**: every status transition recomputes the
//!    record's ACL whole
//! 4. **Compensation over distributed transactions**: pipeline failures
//!    roll state back to a retryable error status
//! 5. **Narrow collaborator traits**: storage, groups, and the registrar
//!    are small async traits with in-memory test implementations

#![warn(missing_docs)]

mod allocator;
mod config;
mod errors;
mod groups;
mod identifiers;
mod merge;
mod minting;
mod node;
mod orchestrator;
mod policy;
mod registrar;
mod resource;
mod search;
mod state_machine;
mod status;
mod storage;

// Re-export core types
pub use allocator::{current_year, next_counter_suffix, random_test_suffix, IdentifierAllocator};
pub use config::{DoiConfig, DEFAULT_ALLOCATION_ATTEMPTS};
pub use errors::{DoiError, DoiResult};
pub use groups::{GroupError, GroupService, InMemoryGroups};
pub use identifiers::{DoiSuffix, GroupRef, JobRef, Principal};
pub use merge::merge;
pub use minting::{JobCancellations, MintingPipeline};
pub use node::{Acl, Node, NodeKind, PropertyKey};
pub use orchestrator::{Caller, CreatedDoi, DoiService, DoiUpdate, FieldUpdate};
pub use policy::evaluate as evaluate_transition;
pub use policy::{can_set_reviewer, initial_acl, RoleSet};
pub use registrar::{InMemoryRegistrar, Registrar, RegistrarError};
pub use resource::{
    doi_filename, Creator, DateEvent, DateType, Identifier, JsonCodec, MetadataCodec, Namespace,
    Resource, ResourceType, ResourceTypeGeneral, Title,
};
pub use search::{DoiListing, SearchContext, SearchFilter, SearchRole};
pub use state_machine::StateMachine;
pub use status::DoiStatus;
pub use storage::{InMemoryStorage, StorageError, StorageService};
