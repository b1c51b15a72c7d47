//! The fleet service: every operation exposed to the transport layer.
//!
//! The API is split into one trait per resource area so that decorators
//! (logging, metrics) can be written against the same seams. [`Service`]
//! is the union and is blanket-implemented for anything implementing all
//! of them.
//!
//! Within a single call the order is always: resolve the owning group,
//! authorize, then touch the repository.

mod access;
mod backup;
mod groups;
mod memberships;
mod metadata;
mod profiles;
mod things;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use fleetgate_storage::{
    Group, GroupMembership, GroupMembershipsPage, GroupsPage, Metadata, PageMetadata, Profile,
    ProfilesPage, Role, Thing, ThingsPage,
};

use crate::access::{AccessConfig, AccessEvaluator, ThingAccessRequest, UserAccessRequest};
use crate::cache::Caches;
use crate::clients::{AuthClient, IdProvider, UsersClient};
use crate::error::{DomainError, DomainResult};
use crate::stores::Repositories;

pub use metadata::merge_metadata;
pub use types::{Backup, GroupMember, PubConfInfo};

/// Thing lifecycle, listing and device-key resolution.
#[async_trait]
pub trait ThingService: Send + Sync {
    /// Creates things. Each thing's group must match its profile's group.
    /// Blank IDs and keys are generated.
    async fn create_things(&self, token: &str, things: Vec<Thing>) -> DomainResult<Vec<Thing>>;

    /// Updates name, profile and metadata. The new profile must belong to
    /// the thing's group.
    async fn update_thing(&self, token: &str, thing: Thing) -> DomainResult<()>;

    /// Shallow-merges each thing's metadata into the stored metadata.
    async fn update_things_metadata(&self, token: &str, things: Vec<Thing>) -> DomainResult<()>;

    async fn update_key(&self, token: &str, id: &str, key: &str) -> DomainResult<()>;

    async fn view_thing(&self, token: &str, id: &str) -> DomainResult<Thing>;

    async fn view_metadata_by_key(&self, key: &str) -> DomainResult<Metadata>;

    async fn list_things(&self, token: &str, pm: &PageMetadata) -> DomainResult<ThingsPage>;

    async fn list_things_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage>;

    async fn list_things_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage>;

    async fn list_things_by_profile(
        &self,
        token: &str,
        profile_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage>;

    async fn remove_things(&self, token: &str, ids: &[String]) -> DomainResult<()>;

    /// Resolves a thing key to the thing ID.
    async fn identify(&self, key: &str) -> DomainResult<String>;

    async fn get_pub_conf_by_key(&self, key: &str) -> DomainResult<PubConfInfo>;

    async fn get_group_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String>;

    async fn get_profile_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String>;
}

/// Profile lifecycle and listing.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn create_profiles(
        &self,
        token: &str,
        profiles: Vec<Profile>,
    ) -> DomainResult<Vec<Profile>>;

    /// Updates name, config and metadata. The group never changes.
    async fn update_profile(&self, token: &str, profile: Profile) -> DomainResult<()>;

    async fn view_profile(&self, token: &str, id: &str) -> DomainResult<Profile>;

    async fn view_profile_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Profile>;

    async fn list_profiles(&self, token: &str, pm: &PageMetadata) -> DomainResult<ProfilesPage>;

    async fn list_profiles_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage>;

    async fn list_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage>;

    async fn remove_profiles(&self, token: &str, ids: &[String]) -> DomainResult<()>;

    async fn get_config_by_thing_id(&self, thing_id: &str) -> DomainResult<Metadata>;

    async fn get_group_id_by_profile_id(&self, profile_id: &str) -> DomainResult<String>;
}

/// Group lifecycle and listing.
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Creates groups in `org_id`. The caller becomes owner of each.
    async fn create_groups(
        &self,
        token: &str,
        org_id: &str,
        groups: Vec<Group>,
    ) -> DomainResult<Vec<Group>>;

    async fn update_group(&self, token: &str, group: Group) -> DomainResult<Group>;

    async fn view_group(&self, token: &str, id: &str) -> DomainResult<Group>;

    async fn view_group_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Group>;

    async fn view_group_by_profile(&self, token: &str, profile_id: &str) -> DomainResult<Group>;

    async fn list_groups(&self, token: &str, pm: &PageMetadata) -> DomainResult<GroupsPage>;

    async fn list_groups_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupsPage>;

    /// Removes groups together with their things, profiles and memberships.
    async fn remove_groups(&self, token: &str, ids: &[String]) -> DomainResult<()>;
}

/// Group membership management.
#[async_trait]
pub trait MembershipService: Send + Sync {
    async fn create_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()>;

    /// Lists memberships with member emails resolved.
    async fn list_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupMembershipsPage>;

    async fn update_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()>;

    async fn remove_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        member_ids: &[String],
    ) -> DomainResult<()>;
}

/// Tenant export and import.
#[async_trait]
pub trait BackupService: Send + Sync {
    /// Full backup. Admin only.
    async fn backup(&self, token: &str) -> DomainResult<Backup>;

    async fn backup_groups_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Group>>;

    async fn backup_things_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Thing>>;

    async fn backup_profiles_by_org(&self, token: &str, org_id: &str)
        -> DomainResult<Vec<Profile>>;

    async fn backup_things_by_group(&self, token: &str, group_id: &str)
        -> DomainResult<Vec<Thing>>;

    async fn backup_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<Profile>>;

    async fn backup_group_memberships(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<GroupMembership>>;

    /// Restores a full backup. Admin only. Not atomic: groups, things,
    /// profiles and memberships are written in that order and the first
    /// failure leaves earlier writes in place.
    async fn restore(&self, token: &str, backup: Backup) -> DomainResult<()>;
}

/// Access checks exposed to other services.
#[async_trait]
pub trait AccessService: Send + Sync {
    async fn can_user_access_thing(&self, req: &UserAccessRequest) -> DomainResult<()>;

    async fn can_user_access_profile(&self, req: &UserAccessRequest) -> DomainResult<()>;

    async fn can_user_access_group(&self, req: &UserAccessRequest) -> DomainResult<()>;

    async fn can_user_access_org(&self, req: &UserAccessRequest) -> DomainResult<()>;

    async fn can_thing_access_group(&self, req: &ThingAccessRequest) -> DomainResult<()>;
}

/// The complete fleet API.
pub trait Service:
    ThingService + ProfileService + GroupService + MembershipService + BackupService + AccessService
{
}

impl<T> Service for T where
    T: ThingService
        + ProfileService
        + GroupService
        + MembershipService
        + BackupService
        + AccessService
{
}

/// [`Service`] implementation over repositories, caches and collaborators.
pub struct FleetService {
    access: AccessEvaluator,
    repos: Repositories,
    caches: Caches,
    users: Arc<dyn UsersClient>,
    ids: Arc<dyn IdProvider>,
}

impl std::fmt::Debug for FleetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetService")
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl FleetService {
    pub fn new(
        repos: Repositories,
        caches: Caches,
        auth: Arc<dyn AuthClient>,
        users: Arc<dyn UsersClient>,
        ids: Arc<dyn IdProvider>,
        config: AccessConfig,
    ) -> Self {
        let access = AccessEvaluator::new(repos.clone(), caches.clone(), auth, config);
        Self {
            access,
            repos,
            caches,
            users,
            ids,
        }
    }

    /// The evaluator used for every access check.
    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    fn next_id(&self) -> DomainResult<String> {
        self.ids.id().map_err(|err| DomainError::Internal {
            message: format!("failed to generate id: {err}"),
        })
    }

    /// Group IDs a non-admin caller may list: their direct memberships.
    async fn member_group_ids(&self, token: &str) -> DomainResult<Vec<String>> {
        let identity = self.access.identify_user(token).await?;
        self.access.group_ids_by_member(&identity.id).await
    }

    /// Group IDs in `org_id` visible to the caller.
    ///
    /// Admins see every group of the org. Anyone else needs Viewer on the
    /// org and then only sees groups they are a direct member of, even if
    /// their org role is higher.
    async fn org_group_ids(&self, token: &str, org_id: &str) -> DomainResult<Vec<String>> {
        if self.access.is_admin(token).await.is_ok() {
            return Ok(self.repos.groups.retrieve_ids_by_org(org_id).await?);
        }

        self.access
            .can_access_org(token, org_id, Role::Viewer)
            .await?;
        let identity = self.access.identify_user(token).await?;
        Ok(self
            .repos
            .groups
            .retrieve_ids_by_org_membership(org_id, &identity.id)
            .await?)
    }
}
