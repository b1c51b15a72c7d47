use async_trait::async_trait;
use fleetgate_storage::{Metadata, PageMetadata, Profile, ProfilesPage, Role};
use tracing::debug;

use crate::access::UserAccessRequest;
use crate::error::{DomainError, DomainResult};

use super::{FleetService, ProfileService};

#[async_trait]
impl ProfileService for FleetService {
    async fn create_profiles(
        &self,
        token: &str,
        profiles: Vec<Profile>,
    ) -> DomainResult<Vec<Profile>> {
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let mut prepared = Vec::with_capacity(profiles.len());

        for mut profile in profiles {
            if profile.group_id.is_empty() {
                return Err(DomainError::invalid_input("profile group id cannot be empty"));
            }

            self.access
                .can_access_group(token, &profile.group_id, Role::Editor)
                .await?;

            if profile.id.is_empty() {
                profile.id = self.next_id()?;
            }
            prepared.push(profile);
        }

        let saved = self.repos.profiles.save(prepared).await?;
        if saved.is_empty() {
            return Err(DomainError::CreateEntity);
        }

        debug!(count = saved.len(), "profiles created");
        Ok(saved)
    }

    async fn update_profile(&self, token: &str, profile: Profile) -> DomainResult<()> {
        self.access
            .can_user_access_profile(&UserAccessRequest::new(token, &profile.id, Role::Editor))
            .await?;
        Ok(self.repos.profiles.update(profile).await?)
    }

    async fn view_profile(&self, token: &str, id: &str) -> DomainResult<Profile> {
        self.access
            .can_user_access_profile(&UserAccessRequest::new(token, id, Role::Viewer))
            .await?;
        Ok(self.repos.profiles.retrieve_by_id(id).await?)
    }

    async fn view_profile_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Profile> {
        self.access
            .can_user_access_thing(&UserAccessRequest::new(token, thing_id, Role::Viewer))
            .await?;
        Ok(self.repos.profiles.retrieve_by_thing(thing_id).await?)
    }

    async fn list_profiles(&self, token: &str, pm: &PageMetadata) -> DomainResult<ProfilesPage> {
        if self.access.is_admin(token).await.is_ok() {
            return Ok(self.repos.profiles.retrieve_all(pm).await?);
        }

        let group_ids = self.member_group_ids(token).await?;
        Ok(self.repos.profiles.retrieve_by_groups(&group_ids, pm).await?)
    }

    async fn list_profiles_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage> {
        let group_ids = self.org_group_ids(token, org_id).await?;
        Ok(self.repos.profiles.retrieve_by_groups(&group_ids, pm).await?)
    }

    async fn list_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage> {
        self.access
            .can_access_group(token, group_id, Role::Viewer)
            .await?;
        Ok(self
            .repos
            .profiles
            .retrieve_by_groups(&[group_id.to_string()], pm)
            .await?)
    }

    async fn remove_profiles(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        for id in ids {
            self.access
                .can_user_access_profile(&UserAccessRequest::new(token, id, Role::Editor))
                .await?;
            self.caches.profiles.remove_group(id).await?;
        }

        self.repos.profiles.remove(ids).await?;
        debug!(count = ids.len(), "profiles removed");
        Ok(())
    }

    async fn get_config_by_thing_id(&self, thing_id: &str) -> DomainResult<Metadata> {
        let profile = self.repos.profiles.retrieve_by_thing(thing_id).await?;
        Ok(profile.config)
    }

    async fn get_group_id_by_profile_id(&self, profile_id: &str) -> DomainResult<String> {
        self.access.group_id_by_profile(profile_id).await
    }
}
