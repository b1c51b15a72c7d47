//! Storage error types.

use thiserror::Error;

use crate::models::EntityKind;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record with the given identifier exists.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// No thing is registered under the presented key.
    ///
    /// The key itself is a device secret and is never echoed back.
    #[error("thing key not found")]
    KeyNotFound,

    /// A record with the same identifier already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: EntityKind, id: String },

    /// The thing key is already assigned to another thing.
    #[error("thing key already in use")]
    DuplicateKey,

    /// The profile is still referenced by at least one thing.
    #[error("profile {profile_id} is currently assigned to thing(s)")]
    ProfileAssigned { profile_id: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(entity: EntityKind, id: impl Into<String>) -> Self {
        StorageError::AlreadyExists {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
