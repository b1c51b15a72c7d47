//! Entity records exchanged between the service layer and repositories.
//!
//! The records only describe shape; persisted layout is up to each
//! repository implementation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Free-form key/value bag attached to entities.
///
/// Values are arbitrary JSON so nested structures survive merges and
/// backup round trips without losing type fidelity.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The kind of entity a record or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Thing,
    Profile,
    Group,
    GroupMembership,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Thing => "thing",
            EntityKind::Profile => "profile",
            EntityKind::Group => "group",
            EntityKind::GroupMembership => "group membership",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role granted by a group membership.
///
/// Roles are ordered: a higher role implies every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Returns true if this role satisfies a request for `required`.
    pub fn grants(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(StorageError::InvalidInput {
                message: format!("unknown role: {other}"),
            }),
        }
    }
}

/// A device.
///
/// `group_id` must always equal the group of the referenced profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,
    pub group_id: String,
    pub profile_id: String,
    pub name: String,
    /// Device secret used for tokenless operations. Globally unique.
    pub key: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A device configuration template owned by a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub config: Metadata,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Unit of resource ownership, owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates a group stamped with the current time.
    pub fn new(id: impl Into<String>, org_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            org_id: org_id.into(),
            name: name.into(),
            description: String::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A (member, group, role) grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub member_id: String,
    pub group_id: String,
    pub role: Role,
    /// Member email, resolved from the users service on read. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupMembership {
    /// Creates a membership stamped with the current time.
    pub fn new(group_id: impl Into<String>, member_id: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            member_id: member_id.into(),
            group_id: group_id.into(),
            role,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Pagination and filtering parameters for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub offset: u64,
    pub limit: u64,
    /// Case-insensitive substring filter on the entity name.
    pub name: Option<String>,
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
            name: None,
        }
    }
}

impl PageMetadata {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            name: None,
        }
    }

    /// Sets the name filter.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns true if `name` passes the name filter.
    pub fn matches_name(&self, name: &str) -> bool {
        match &self.name {
            Some(filter) => name.to_lowercase().contains(&filter.to_lowercase()),
            None => true,
        }
    }

    /// Cuts the requested window out of an already filtered, ordered list.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();

        Page {
            items,
            total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            offset: 0,
            limit: 0,
        }
    }
}

pub type ThingsPage = Page<Thing>;
pub type ProfilesPage = Page<Profile>;
pub type GroupsPage = Page<Group>;
pub type GroupMembershipsPage = Page<GroupMembership>;
