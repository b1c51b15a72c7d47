use async_trait::async_trait;
use fleetgate_storage::{Group, GroupMembership, Profile, Role, Thing};
use tracing::{info, warn};

use crate::error::DomainResult;

use super::{Backup, BackupService, FleetService};

impl FleetService {
    /// Writes a backup in dependency order. Stops at the first failure.
    async fn restore_all(&self, backup: Backup) -> DomainResult<()> {
        for group in backup.groups {
            self.repos.groups.save(group).await?;
        }

        if !backup.things.is_empty() {
            self.repos.things.save(backup.things).await?;
        }

        if !backup.profiles.is_empty() {
            self.repos.profiles.save(backup.profiles).await?;
        }

        for membership in backup.group_memberships {
            let member_id = membership.member_id.clone();
            self.repos.memberships.save(vec![membership]).await?;
            self.caches
                .groups
                .remove_group_ids_by_member(&member_id)
                .await?;
        }

        Ok(())
    }

    async fn org_scope(&self, token: &str, org_id: &str) -> DomainResult<Vec<String>> {
        self.access
            .can_access_org(token, org_id, Role::Owner)
            .await?;
        Ok(self.repos.groups.retrieve_ids_by_org(org_id).await?)
    }
}

#[async_trait]
impl BackupService for FleetService {
    async fn backup(&self, token: &str) -> DomainResult<Backup> {
        self.access.is_admin(token).await?;

        let (groups, things, profiles, mut group_memberships) = futures::try_join!(
            self.repos.groups.backup_all(),
            self.repos.things.backup_all(),
            self.repos.profiles.backup_all(),
            self.repos.memberships.backup_all(),
        )?;
        self.resolve_emails(&mut group_memberships).await?;

        info!(
            groups = groups.len(),
            things = things.len(),
            profiles = profiles.len(),
            memberships = group_memberships.len(),
            "backup created"
        );

        Ok(Backup {
            groups,
            things,
            profiles,
            group_memberships,
        })
    }

    async fn backup_groups_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Group>> {
        self.access
            .can_access_org(token, org_id, Role::Owner)
            .await?;
        Ok(self.repos.groups.backup_by_org(org_id).await?)
    }

    async fn backup_things_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Thing>> {
        let group_ids = self.org_scope(token, org_id).await?;
        Ok(self.repos.things.backup_by_groups(&group_ids).await?)
    }

    async fn backup_profiles_by_org(
        &self,
        token: &str,
        org_id: &str,
    ) -> DomainResult<Vec<Profile>> {
        let group_ids = self.org_scope(token, org_id).await?;
        Ok(self.repos.profiles.backup_by_groups(&group_ids).await?)
    }

    async fn backup_things_by_group(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<Thing>> {
        self.access
            .can_access_group(token, group_id, Role::Owner)
            .await?;
        Ok(self
            .repos
            .things
            .backup_by_groups(&[group_id.to_string()])
            .await?)
    }

    async fn backup_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<Profile>> {
        self.access
            .can_access_group(token, group_id, Role::Owner)
            .await?;
        Ok(self
            .repos
            .profiles
            .backup_by_groups(&[group_id.to_string()])
            .await?)
    }

    async fn backup_group_memberships(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<GroupMembership>> {
        self.access
            .can_access_group(token, group_id, Role::Owner)
            .await?;

        let mut memberships = self.repos.memberships.backup_by_group(group_id).await?;
        self.resolve_emails(&mut memberships).await?;
        Ok(memberships)
    }

    async fn restore(&self, token: &str, backup: Backup) -> DomainResult<()> {
        self.access.is_admin(token).await?;

        let counts = (
            backup.groups.len(),
            backup.things.len(),
            backup.profiles.len(),
            backup.group_memberships.len(),
        );

        if let Err(err) = self.restore_all(backup).await {
            warn!(error = %err, "restore aborted, earlier writes were kept");
            return Err(err);
        }

        info!(
            groups = counts.0,
            things = counts.1,
            profiles = counts.2,
            memberships = counts.3,
            "backup restored"
        );
        Ok(())
    }
}
