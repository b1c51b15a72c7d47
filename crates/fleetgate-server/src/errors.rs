//! Classification of domain errors for the transport layer.
//!
//! [`classify`] maps every [`DomainError`] onto a protocol-agnostic
//! [`ErrorKind`] that an HTTP or gRPC front end can translate directly.
//! Infrastructure failures (cache, storage, internal) are collapsed into a
//! generic message so that backend details do not leak to clients.

use fleetgate_domain::DomainError;

/// Protocol-agnostic error classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials (401)
    Unauthenticated(String),
    /// Caller lacks the required role (403)
    PermissionDenied(String),
    /// Resource does not exist (404)
    NotFound(String),
    /// Duplicate resource or a profile still in use (409)
    Conflict(String),
    /// Malformed request (400)
    InvalidInput(String),
    /// An upstream call exceeded its deadline (504)
    Timeout(String),
    /// Anything else (500)
    Internal(String),
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Unauthenticated(_) => 401,
            ErrorKind::PermissionDenied(_) => 403,
            ErrorKind::NotFound(_) => 404,
            ErrorKind::Conflict(_) => 409,
            ErrorKind::InvalidInput(_) => 400,
            ErrorKind::Timeout(_) => 504,
            ErrorKind::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ErrorKind::Unauthenticated(msg)
            | ErrorKind::PermissionDenied(msg)
            | ErrorKind::NotFound(msg)
            | ErrorKind::Conflict(msg)
            | ErrorKind::InvalidInput(msg)
            | ErrorKind::Timeout(msg)
            | ErrorKind::Internal(msg) => msg,
        }
    }
}

/// Classifies a domain error.
pub fn classify(err: &DomainError) -> ErrorKind {
    match err {
        DomainError::Authentication { .. } => {
            ErrorKind::Unauthenticated("failed to perform authentication".to_string())
        }
        DomainError::Authorization { .. } => {
            ErrorKind::PermissionDenied("failed to perform authorization".to_string())
        }
        DomainError::NotFound { message } => ErrorKind::NotFound(message.clone()),
        DomainError::Conflict { message } => ErrorKind::Conflict(message.clone()),
        DomainError::ProfileAssigned { .. } => ErrorKind::Conflict(err.to_string()),
        DomainError::InvalidInput { message } => ErrorKind::InvalidInput(message.clone()),
        DomainError::Timeout { .. } => ErrorKind::Timeout("upstream call timed out".to_string()),
        DomainError::CreateEntity
        | DomainError::Cache(_)
        | DomainError::Storage { .. }
        | DomainError::Internal { .. } => ErrorKind::Internal("internal error".to_string()),
    }
}
