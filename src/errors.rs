//! Error types for DOI lifecycle operations

use thiserror::Error;

/// Errors that can occur while orchestrating a DOI through its lifecycle
#[derive(Debug, Clone, Error)]
pub enum DoiError {
    /// Malformed or unknown input field, or missing required content
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller is not permitted to perform the operation
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// An immutable metadata field differs between the submitted and stored
    /// documents
    #[error("{field} update is not allowed, expected: {expected}, actual: {actual}")]
    ImmutableField {
        /// Name of the offending field
        field: String,
        /// Value held by the stored document
        expected: String,
        /// Value submitted by the caller
        actual: String,
    },

    /// Requested status change is not in the transition table or the caller
    /// role check failed
    #[error("Invalid status change requested: from '{from}' to '{to}'")]
    InvalidStateTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Suffix reservation lost to a concurrent create; retried internally
    #[error("DOI suffix already allocated: {suffix}")]
    AllocationConflict {
        /// The suffix that was already taken
        suffix: String,
    },

    /// Allocation retries exhausted; transient, the caller may retry
    #[error("DOI allocation failed after {attempts} attempts")]
    AllocationExhausted {
        /// Number of reservation attempts made
        attempts: u32,
    },

    /// Storage, group-service, or registrar failure
    #[error("Remote service error: {service} - {message}")]
    Remote {
        /// Name of the remote collaborator
        service: String,
        /// Error message from the service
        message: String,
    },

    /// DOI or node not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Node or group already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Metadata document could not be serialized or parsed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for DOI lifecycle operations
pub type DoiResult<T> = Result<T, DoiError>;

impl From<serde_json::Error> for DoiError {
    fn from(err: serde_json::Error) -> Self {
        DoiError::Serialization(err.to_string())
    }
}

impl DoiError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DoiError::Validation(msg.into())
    }

    /// Create an authorization error
    pub fn authorization(msg: impl Into<String>) -> Self {
        DoiError::Authorization(msg.into())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, DoiError::Validation(_))
    }

    /// Check if this error denies the caller access: role/state mismatch,
    /// immutable-field edit, or unauthorized transition
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            DoiError::Authorization(_)
                | DoiError::ImmutableField { .. }
                | DoiError::InvalidStateTransition { .. }
        )
    }

    /// Check if this error may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DoiError::AllocationExhausted { .. } | DoiError::Remote { .. }
        )
    }
}
