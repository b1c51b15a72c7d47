//! External collaborators consumed by the domain layer.
//!
//! The authorization/identity service, the users service and the ID provider
//! are injected once at construction and shared across all requests, so
//! every implementation must be safe for concurrent use.

use std::fmt;

use async_trait::async_trait;
use fleetgate_storage::Role;
use thiserror::Error;

/// Subject namespace of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Platform-wide admin check. The object is ignored.
    Root,
    Org,
    Group,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Root => "root",
            Subject::Org => "org",
            Subject::Group => "group",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization triple plus the caller's token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub token: String,
    pub object: String,
    pub subject: Subject,
    /// Required role. `None` for root checks.
    pub action: Option<Role>,
}

impl AuthorizeRequest {
    /// Request for the platform admin check.
    pub fn root(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            object: String::new(),
            subject: Subject::Root,
            action: None,
        }
    }

    /// Request for a role on an org or group.
    pub fn scoped(
        token: impl Into<String>,
        object: impl Into<String>,
        subject: Subject,
        action: Role,
    ) -> Self {
        Self {
            token: token.into(),
            object: object.into(),
            subject,
            action: Some(action),
        }
    }
}

impl fmt::Debug for AuthorizeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizeRequest")
            .field("token", &"<redacted>")
            .field("object", &self.object)
            .field("subject", &self.subject)
            .field("action", &self.action)
            .finish()
    }
}

/// Identity a token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// A user record from the users service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Errors returned by external collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The token is missing, expired or unknown.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The identity lacks the requested role.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The collaborator could not be reached or failed internally.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Result type for collaborator calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Authorization and identity service.
#[async_trait]
pub trait AuthClient: Send + Sync + 'static {
    /// Succeeds if the token's identity holds `action` on `object`.
    async fn authorize(&self, req: AuthorizeRequest) -> ClientResult<()>;

    /// Resolves a user token to an identity.
    async fn identify(&self, token: &str) -> ClientResult<Identity>;
}

/// Users directory.
#[async_trait]
pub trait UsersClient: Send + Sync + 'static {
    /// Looks up users by ID, optionally keeping only emails containing
    /// `email_filter`. Unknown IDs are skipped.
    async fn get_users_by_ids(
        &self,
        ids: &[String],
        email_filter: Option<&str>,
    ) -> ClientResult<Vec<User>>;
}

/// Generates unique identifiers for new entities and thing keys.
pub trait IdProvider: Send + Sync + 'static {
    fn id(&self) -> ClientResult<String>;
}

/// UUID v4 identifier provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProvider;

impl UuidProvider {
    pub fn new() -> Self {
        Self
    }
}

impl IdProvider for UuidProvider {
    fn id(&self) -> ClientResult<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
