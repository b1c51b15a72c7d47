//! Domain error types for access control and lifecycle operations.

use fleetgate_storage::StorageError;
use thiserror::Error;

use crate::cache::CacheError;

/// Domain-specific errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The token could not be resolved to an identity.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The identity lacks the required role on the resolved object.
    ///
    /// Also used for thing/profile group mismatches, which are treated as an
    /// access-boundary violation.
    #[error("unauthorized access: {message}")]
    Authorization { message: String },

    /// Lookup of an ID or key found nothing.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The repository reported success but returned nothing.
    #[error("failed to create entity")]
    CreateEntity,

    /// Duplicate identifier, thing key or membership.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The profile is still referenced by things.
    #[error("profile {profile_id} is assigned to one or more things")]
    ProfileAssigned { profile_id: String },

    /// Malformed request data.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A cache read or write failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The repository failed for reasons other than the above.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// An external call did not complete within its deadline.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Internal failure, e.g. the ID provider could not produce an ID.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub(crate) fn authorization(message: impl Into<String>) -> Self {
        DomainError::Authorization {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } | StorageError::KeyNotFound => DomainError::NotFound {
                message: err.to_string(),
            },
            StorageError::AlreadyExists { .. } | StorageError::DuplicateKey => {
                DomainError::Conflict {
                    message: err.to_string(),
                }
            }
            StorageError::ProfileAssigned { profile_id } => {
                DomainError::ProfileAssigned { profile_id }
            }
            StorageError::InvalidInput { message } => DomainError::InvalidInput { message },
            StorageError::InternalError { message } => DomainError::Storage { message },
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
