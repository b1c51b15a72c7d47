use async_trait::async_trait;
use chrono::Utc;
use fleetgate_storage::{Group, GroupMembership, GroupsPage, PageMetadata, Role};
use tracing::debug;

use crate::access::UserAccessRequest;
use crate::error::{DomainError, DomainResult};

use super::{FleetService, GroupService};

impl FleetService {
    /// Drops every cache entry that refers to the group or anything it owns.
    async fn purge_group_caches(&self, group_id: &str) -> DomainResult<()> {
        let scope = [group_id.to_string()];

        for thing in self.repos.things.backup_by_groups(&scope).await? {
            self.caches.things.remove(&thing.id).await?;
            self.caches.things.remove_group(&thing.id).await?;
        }
        for profile in self.repos.profiles.backup_by_groups(&scope).await? {
            self.caches.profiles.remove_group(&profile.id).await?;
        }
        for membership in self.repos.memberships.backup_by_group(group_id).await? {
            self.caches
                .groups
                .remove_group_ids_by_member(&membership.member_id)
                .await?;
        }
        self.caches.groups.remove_group(group_id).await?;

        Ok(())
    }
}

#[async_trait]
impl GroupService for FleetService {
    async fn create_groups(
        &self,
        token: &str,
        org_id: &str,
        groups: Vec<Group>,
    ) -> DomainResult<Vec<Group>> {
        if org_id.is_empty() {
            return Err(DomainError::invalid_input("org id cannot be empty"));
        }

        self.access
            .can_access_org(token, org_id, Role::Editor)
            .await?;
        let creator = self.access.identify_user(token).await?;

        let mut created = Vec::with_capacity(groups.len());
        for mut group in groups {
            if group.id.is_empty() {
                group.id = self.next_id()?;
            }
            let now = Utc::now();
            group.org_id = org_id.to_string();
            group.created_at = now;
            group.updated_at = now;

            let group = self.repos.groups.save(group).await?;
            self.repos
                .memberships
                .save(vec![GroupMembership::new(&group.id, &creator.id, Role::Owner)])
                .await?;
            // Invalidate per group: a later failure in this batch must not
            // leave the creator's cached set missing a group they now own.
            self.caches
                .groups
                .remove_group_ids_by_member(&creator.id)
                .await?;
            created.push(group);
        }

        debug!(org_id, count = created.len(), "groups created");
        Ok(created)
    }

    async fn update_group(&self, token: &str, mut group: Group) -> DomainResult<Group> {
        self.access
            .can_access_group(token, &group.id, Role::Editor)
            .await?;

        group.updated_at = Utc::now();
        Ok(self.repos.groups.update(group).await?)
    }

    async fn view_group(&self, token: &str, id: &str) -> DomainResult<Group> {
        self.access
            .can_access_group(token, id, Role::Viewer)
            .await?;
        Ok(self.repos.groups.retrieve_by_id(id).await?)
    }

    async fn view_group_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Group> {
        self.access
            .can_user_access_thing(&UserAccessRequest::new(token, thing_id, Role::Viewer))
            .await?;
        let group_id = self.access.group_id_by_thing(thing_id).await?;
        Ok(self.repos.groups.retrieve_by_id(&group_id).await?)
    }

    async fn view_group_by_profile(&self, token: &str, profile_id: &str) -> DomainResult<Group> {
        self.access
            .can_user_access_profile(&UserAccessRequest::new(token, profile_id, Role::Viewer))
            .await?;
        let group_id = self.access.group_id_by_profile(profile_id).await?;
        Ok(self.repos.groups.retrieve_by_id(&group_id).await?)
    }

    async fn list_groups(&self, token: &str, pm: &PageMetadata) -> DomainResult<GroupsPage> {
        if self.access.is_admin(token).await.is_ok() {
            return Ok(self.repos.groups.retrieve_all(pm).await?);
        }

        let group_ids = self.member_group_ids(token).await?;
        Ok(self.repos.groups.retrieve_by_ids(&group_ids, pm).await?)
    }

    async fn list_groups_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupsPage> {
        let group_ids = self.org_group_ids(token, org_id).await?;
        Ok(self.repos.groups.retrieve_by_ids(&group_ids, pm).await?)
    }

    async fn remove_groups(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        for id in ids {
            self.access
                .can_access_group(token, id, Role::Owner)
                .await?;
        }

        for id in ids {
            self.purge_group_caches(id).await?;
        }

        self.repos.groups.remove(ids).await?;
        debug!(count = ids.len(), "groups removed");
        Ok(())
    }
}
