//! Identifier value types for DOIs, groups, principals, and async jobs

use crate::errors::{DoiError, DoiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The locally-assigned component of a DOI, e.g. `25.0042` or a random
/// test token
///
/// A suffix is assigned exactly once, at allocation time, and never changes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DoiSuffix(String);

impl DoiSuffix {
    /// Create a suffix, rejecting empty values and path separators
    pub fn new(value: impl Into<String>) -> DoiResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DoiError::validation("DOI suffix must not be empty"));
        }
        if value.contains('/') {
            return Err(DoiError::validation(format!(
                "DOI suffix must not contain '/': {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Get the suffix as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DoiSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DoiSuffix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reference to a group in the group-management service
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupRef(String);

impl GroupRef {
    /// Create a group reference from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the group name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated principal identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create a principal from its identity string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for an asynchronous recursive-property job
///
/// Returned by the storage service when the job is started; recorded on the
/// DOI record while the job is outstanding so it can be cancelled on
/// shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRef(String);

impl JobRef {
    /// Create a job reference from an existing handle string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random job reference
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
