use fleetgate_storage::{Group, GroupMembership, Metadata, Profile, Role, Thing};
use serde::{Deserialize, Serialize};

/// Full tenant export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub groups: Vec<Group>,
    pub things: Vec<Thing>,
    pub profiles: Vec<Profile>,
    pub group_memberships: Vec<GroupMembership>,
}

/// Routing information for the message ingestion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubConfInfo {
    /// ID of the publishing thing.
    pub publisher_id: String,
    /// Config of the thing's profile.
    pub profile_config: Metadata,
}

/// A member and the role to grant or set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub member_id: String,
    pub role: Role,
}

impl GroupMember {
    pub fn new(member_id: impl Into<String>, role: Role) -> Self {
        Self {
            member_id: member_id.into(),
            role,
        }
    }
}
