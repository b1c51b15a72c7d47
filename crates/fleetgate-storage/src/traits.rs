//! Repository trait definitions.
//!
//! One trait per entity kind. Implementations must be thread-safe
//! (Send + Sync) and support concurrent async access; the service layer
//! shares a single instance across all in-flight requests.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    Group, GroupMembership, GroupMembershipsPage, GroupsPage, PageMetadata, Profile,
    ProfilesPage, Role, Thing, ThingsPage,
};

/// Persistence for things.
#[async_trait]
pub trait ThingRepository: Send + Sync + 'static {
    /// Persists new things and returns what was stored.
    ///
    /// Fails with `AlreadyExists` on a duplicate ID and `DuplicateKey` on a
    /// key collision. A failed batch stores nothing.
    async fn save(&self, things: Vec<Thing>) -> StorageResult<Vec<Thing>>;

    /// Updates name, profile and metadata. The group is never changed.
    async fn update(&self, thing: Thing) -> StorageResult<()>;

    /// Replaces the thing's key.
    async fn update_key(&self, id: &str, key: &str) -> StorageResult<()>;

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Thing>;

    /// Resolves a thing key to the thing's ID.
    async fn retrieve_by_key(&self, key: &str) -> StorageResult<String>;

    async fn retrieve_by_groups(
        &self,
        group_ids: &[String],
        pm: &PageMetadata,
    ) -> StorageResult<ThingsPage>;

    async fn retrieve_by_profile(
        &self,
        profile_id: &str,
        pm: &PageMetadata,
    ) -> StorageResult<ThingsPage>;

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<ThingsPage>;

    /// Removes things. Unknown IDs are ignored.
    async fn remove(&self, ids: &[String]) -> StorageResult<()>;

    async fn backup_all(&self) -> StorageResult<Vec<Thing>>;

    async fn backup_by_groups(&self, group_ids: &[String]) -> StorageResult<Vec<Thing>>;
}

/// Persistence for profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    /// Persists new profiles and returns what was stored.
    async fn save(&self, profiles: Vec<Profile>) -> StorageResult<Vec<Profile>>;

    /// Updates name, config and metadata. The group is never changed.
    async fn update(&self, profile: Profile) -> StorageResult<()>;

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Profile>;

    /// Returns the profile assigned to the given thing.
    async fn retrieve_by_thing(&self, thing_id: &str) -> StorageResult<Profile>;

    async fn retrieve_by_groups(
        &self,
        group_ids: &[String],
        pm: &PageMetadata,
    ) -> StorageResult<ProfilesPage>;

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<ProfilesPage>;

    /// Removes profiles.
    ///
    /// Fails with `ProfileAssigned` if any thing still references one of
    /// them; in that case nothing is removed.
    async fn remove(&self, ids: &[String]) -> StorageResult<()>;

    async fn backup_all(&self) -> StorageResult<Vec<Profile>>;

    async fn backup_by_groups(&self, group_ids: &[String]) -> StorageResult<Vec<Profile>>;
}

/// Persistence for groups.
#[async_trait]
pub trait GroupRepository: Send + Sync + 'static {
    async fn save(&self, group: Group) -> StorageResult<Group>;

    /// Updates name, description, metadata and `updated_at`.
    /// The owning org is never changed.
    async fn update(&self, group: Group) -> StorageResult<Group>;

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Group>;

    async fn retrieve_by_ids(&self, ids: &[String], pm: &PageMetadata)
        -> StorageResult<GroupsPage>;

    async fn retrieve_by_org(&self, org_id: &str, pm: &PageMetadata) -> StorageResult<GroupsPage>;

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<GroupsPage>;

    async fn retrieve_ids_by_org(&self, org_id: &str) -> StorageResult<Vec<String>>;

    /// IDs of the org's groups in which `member_id` holds a direct membership.
    async fn retrieve_ids_by_org_membership(
        &self,
        org_id: &str,
        member_id: &str,
    ) -> StorageResult<Vec<String>>;

    /// Removes groups together with the things, profiles and memberships
    /// they own.
    async fn remove(&self, ids: &[String]) -> StorageResult<()>;

    async fn backup_all(&self) -> StorageResult<Vec<Group>>;

    async fn backup_by_org(&self, org_id: &str) -> StorageResult<Vec<Group>>;
}

/// Persistence for group memberships.
#[async_trait]
pub trait GroupMembershipsRepository: Send + Sync + 'static {
    /// Persists new memberships. A duplicate (member, group) pair fails with
    /// `AlreadyExists` and nothing from the batch is stored.
    async fn save(&self, memberships: Vec<GroupMembership>) -> StorageResult<()>;

    /// Changes roles of existing memberships.
    async fn update(&self, memberships: Vec<GroupMembership>) -> StorageResult<()>;

    async fn retrieve_role(&self, group_id: &str, member_id: &str) -> StorageResult<Role>;

    async fn retrieve_by_group(
        &self,
        group_id: &str,
        pm: &PageMetadata,
    ) -> StorageResult<GroupMembershipsPage>;

    async fn retrieve_group_ids_by_member(&self, member_id: &str) -> StorageResult<Vec<String>>;

    async fn remove(&self, group_id: &str, member_ids: &[String]) -> StorageResult<()>;

    async fn backup_all(&self) -> StorageResult<Vec<GroupMembership>>;

    async fn backup_by_group(&self, group_id: &str) -> StorageResult<Vec<GroupMembership>>;
}
