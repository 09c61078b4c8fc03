//! DOI lifecycle states
//!
//! A DOI moves along two tracks that share one status field: the review
//! workflow (draft, review ready, in review, rejected, approved) and the
//! minting pipeline (locking data, registering, minted). The two tracks are
//! deliberately orthogonal; nothing here connects approval to minting.

use crate::errors::{DoiError, DoiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a DOI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoiStatus {
    /// Initial state; the requester is editing
    Draft,
    /// Asynchronous data-lock job outstanding
    LockingData,
    /// Data area locked and public; ready to register
    LockedData,
    /// Data-lock attempt failed; safe to retry
    ErrorLockingData,
    /// Registrar call in flight
    Registering,
    /// Registrar attempt failed; safe to retry
    ErrorRegistering,
    /// Registered and findable
    Minted,
    /// Post-mint bookkeeping finished
    Completed,
    /// Submitted for review by the requester
    ReviewReady,
    /// Accepted for review by a publisher
    InReview,
    /// Review outcome: rejected
    Rejected,
    /// Review outcome: approved
    Approved,
}

impl DoiStatus {
    /// All states, for table-driven tests
    pub const ALL: [DoiStatus; 12] = [
        DoiStatus::Draft,
        DoiStatus::LockingData,
        DoiStatus::LockedData,
        DoiStatus::ErrorLockingData,
        DoiStatus::Registering,
        DoiStatus::ErrorRegistering,
        DoiStatus::Minted,
        DoiStatus::Completed,
        DoiStatus::ReviewReady,
        DoiStatus::InReview,
        DoiStatus::Rejected,
        DoiStatus::Approved,
    ];

    /// The stable token persisted on the DOI record
    pub fn as_str(&self) -> &'static str {
        match self {
            DoiStatus::Draft => "draft",
            DoiStatus::LockingData => "locking_data",
            DoiStatus::LockedData => "locked_data",
            DoiStatus::ErrorLockingData => "error_locking_data",
            DoiStatus::Registering => "registering",
            DoiStatus::ErrorRegistering => "error_registering",
            DoiStatus::Minted => "minted",
            DoiStatus::Completed => "completed",
            DoiStatus::ReviewReady => "review_ready",
            DoiStatus::InReview => "in_review",
            DoiStatus::Rejected => "rejected",
            DoiStatus::Approved => "approved",
        }
    }

    /// Parse a persisted status token
    pub fn parse(value: &str) -> DoiResult<Self> {
        DoiStatus::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| DoiError::validation(format!("Unknown DOI status: {value}")))
    }

    /// Terminal with respect to the minting pipeline: the mint action is a
    /// no-op in these states
    pub fn is_pipeline_terminal(&self) -> bool {
        matches!(self, DoiStatus::Minted | DoiStatus::Completed)
    }
}

impl fmt::Display for DoiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
