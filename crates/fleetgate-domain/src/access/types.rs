//! Request types for access checks.

use std::fmt;

use fleetgate_storage::Role;

/// A user asking for `action` on a resource.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAccessRequest {
    pub token: String,
    /// Thing, profile, group or org ID depending on the check.
    pub id: String,
    pub action: Role,
}

impl UserAccessRequest {
    pub fn new(token: impl Into<String>, id: impl Into<String>, action: Role) -> Self {
        Self {
            token: token.into(),
            id: id.into(),
            action,
        }
    }
}

impl fmt::Debug for UserAccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccessRequest")
            .field("token", &"<redacted>")
            .field("id", &self.id)
            .field("action", &self.action)
            .finish()
    }
}

/// A device, identified by its key, asking for access to a group.
#[derive(Clone, PartialEq, Eq)]
pub struct ThingAccessRequest {
    pub key: String,
    /// Group ID.
    pub id: String,
}

impl ThingAccessRequest {
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
        }
    }
}

impl fmt::Debug for ThingAccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThingAccessRequest")
            .field("key", &"<redacted>")
            .field("id", &self.id)
            .finish()
    }
}
