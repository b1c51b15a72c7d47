use std::collections::HashMap;

use async_trait::async_trait;
use fleetgate_storage::{GroupMembership, GroupMembershipsPage, PageMetadata, Role};

use crate::access::bounded;
use crate::clients::ClientError;
use crate::error::{DomainError, DomainResult};

use super::{FleetService, GroupMember, MembershipService};

impl FleetService {
    /// Fills in member emails from the users service.
    pub(super) async fn resolve_emails(
        &self,
        memberships: &mut [GroupMembership],
    ) -> DomainResult<()> {
        if memberships.is_empty() {
            return Ok(());
        }

        let mut ids: Vec<String> = memberships.iter().map(|m| m.member_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let users = bounded(
            self.access.config().rpc_timeout,
            self.users.get_users_by_ids(&ids, None),
        )
        .await?
        .map_err(|err| match err {
            ClientError::Unauthenticated(message) => DomainError::Authentication { message },
            other => DomainError::Internal {
                message: format!("users lookup failed: {other}"),
            },
        })?;

        let emails: HashMap<String, String> =
            users.into_iter().map(|user| (user.id, user.email)).collect();
        for membership in memberships.iter_mut() {
            membership.email = emails.get(&membership.member_id).cloned();
        }

        Ok(())
    }

    async fn invalidate_members(&self, member_ids: &[String]) -> DomainResult<()> {
        for member_id in member_ids {
            self.caches
                .groups
                .remove_group_ids_by_member(member_id)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipService for FleetService {
    async fn create_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()> {
        self.access
            .can_access_group(token, group_id, Role::Admin)
            .await?;
        // Admins pass the check for any ID; the group itself must exist.
        self.repos.groups.retrieve_by_id(group_id).await?;

        let member_ids: Vec<String> = members.iter().map(|m| m.member_id.clone()).collect();
        let memberships: Vec<GroupMembership> = members
            .into_iter()
            .map(|member| GroupMembership::new(group_id, member.member_id, member.role))
            .collect();

        self.repos.memberships.save(memberships).await?;
        self.invalidate_members(&member_ids).await
    }

    async fn list_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupMembershipsPage> {
        self.access
            .can_access_group(token, group_id, Role::Viewer)
            .await?;

        let mut page = self
            .repos
            .memberships
            .retrieve_by_group(group_id, pm)
            .await?;
        self.resolve_emails(&mut page.items).await?;
        Ok(page)
    }

    async fn update_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()> {
        self.access
            .can_access_group(token, group_id, Role::Admin)
            .await?;

        // Only role and updated_at are applied by the repository.
        let member_ids: Vec<String> = members.iter().map(|m| m.member_id.clone()).collect();
        let memberships: Vec<GroupMembership> = members
            .into_iter()
            .map(|member| GroupMembership::new(group_id, member.member_id, member.role))
            .collect();

        self.repos.memberships.update(memberships).await?;
        self.invalidate_members(&member_ids).await
    }

    async fn remove_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        member_ids: &[String],
    ) -> DomainResult<()> {
        self.access
            .can_access_group(token, group_id, Role::Admin)
            .await?;

        self.repos.memberships.remove(group_id, member_ids).await?;
        self.invalidate_members(member_ids).await
    }
}
