use async_trait::async_trait;
use fleetgate_storage::{Metadata, PageMetadata, Role, Thing, ThingsPage};
use tracing::{debug, warn};

use crate::access::UserAccessRequest;
use crate::error::{DomainError, DomainResult};

use super::metadata::merge_metadata;
use super::{FleetService, PubConfInfo, ThingService};

impl FleetService {
    /// Checks the thing/profile group invariant for a new or updated thing.
    async fn ensure_profile_in_group(&self, profile_id: &str, group_id: &str) -> DomainResult<()> {
        let profile_group = self.access.group_id_by_profile(profile_id).await?;
        if profile_group != group_id {
            warn!(profile_id, group_id, profile_group = %profile_group, "thing and profile group mismatch");
            return Err(DomainError::authorization(format!(
                "profile {profile_id} does not belong to group {group_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ThingService for FleetService {
    async fn create_things(&self, token: &str, things: Vec<Thing>) -> DomainResult<Vec<Thing>> {
        if things.is_empty() {
            return Ok(Vec::new());
        }

        let mut prepared = Vec::with_capacity(things.len());

        for mut thing in things {
            if thing.group_id.is_empty() {
                return Err(DomainError::invalid_input("thing group id cannot be empty"));
            }
            if thing.profile_id.is_empty() {
                return Err(DomainError::invalid_input("thing profile id cannot be empty"));
            }

            self.access
                .can_access_group(token, &thing.group_id, Role::Editor)
                .await?;
            self.ensure_profile_in_group(&thing.profile_id, &thing.group_id)
                .await?;

            if thing.id.is_empty() {
                thing.id = self.next_id()?;
            }
            if thing.key.is_empty() {
                thing.key = self.next_id()?;
            }
            prepared.push(thing);
        }

        let saved = self.repos.things.save(prepared).await?;
        if saved.is_empty() {
            return Err(DomainError::CreateEntity);
        }

        debug!(count = saved.len(), "things created");
        Ok(saved)
    }

    async fn update_thing(&self, token: &str, thing: Thing) -> DomainResult<()> {
        self.access
            .can_user_access_thing(&UserAccessRequest::new(token, &thing.id, Role::Editor))
            .await?;

        let group_id = self.access.group_id_by_thing(&thing.id).await?;
        self.ensure_profile_in_group(&thing.profile_id, &group_id)
            .await?;

        Ok(self.repos.things.update(thing).await?)
    }

    async fn update_things_metadata(&self, token: &str, things: Vec<Thing>) -> DomainResult<()> {
        for thing in things {
            self.access
                .can_user_access_thing(&UserAccessRequest::new(token, &thing.id, Role::Editor))
                .await?;

            let mut current = self.repos.things.retrieve_by_id(&thing.id).await?;
            merge_metadata(&mut current.metadata, thing.metadata);
            self.repos.things.update(current).await?;
        }
        Ok(())
    }

    async fn update_key(&self, token: &str, id: &str, key: &str) -> DomainResult<()> {
        self.access
            .can_user_access_thing(&UserAccessRequest::new(token, id, Role::Editor))
            .await?;

        self.repos.things.update_key(id, key).await?;
        // The old key must stop resolving.
        self.caches.things.remove(id).await?;
        Ok(())
    }

    async fn view_thing(&self, token: &str, id: &str) -> DomainResult<Thing> {
        self.access
            .can_user_access_thing(&UserAccessRequest::new(token, id, Role::Viewer))
            .await?;
        Ok(self.repos.things.retrieve_by_id(id).await?)
    }

    async fn view_metadata_by_key(&self, key: &str) -> DomainResult<Metadata> {
        let thing_id = self.access.identify(key).await?;
        let thing = self.repos.things.retrieve_by_id(&thing_id).await?;
        Ok(thing.metadata)
    }

    async fn list_things(&self, token: &str, pm: &PageMetadata) -> DomainResult<ThingsPage> {
        if self.access.is_admin(token).await.is_ok() {
            return Ok(self.repos.things.retrieve_all(pm).await?);
        }

        let group_ids = self.member_group_ids(token).await?;
        Ok(self.repos.things.retrieve_by_groups(&group_ids, pm).await?)
    }

    async fn list_things_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        let group_ids = self.org_group_ids(token, org_id).await?;
        Ok(self.repos.things.retrieve_by_groups(&group_ids, pm).await?)
    }

    async fn list_things_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        self.access
            .can_access_group(token, group_id, Role::Viewer)
            .await?;
        Ok(self
            .repos
            .things
            .retrieve_by_groups(&[group_id.to_string()], pm)
            .await?)
    }

    async fn list_things_by_profile(
        &self,
        token: &str,
        profile_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        self.access
            .can_user_access_profile(&UserAccessRequest::new(token, profile_id, Role::Viewer))
            .await?;
        Ok(self.repos.things.retrieve_by_profile(profile_id, pm).await?)
    }

    async fn remove_things(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        for id in ids {
            self.access
                .can_user_access_thing(&UserAccessRequest::new(token, id, Role::Editor))
                .await?;
            self.caches.things.remove(id).await?;
            self.caches.things.remove_group(id).await?;
        }

        self.repos.things.remove(ids).await?;
        debug!(count = ids.len(), "things removed");
        Ok(())
    }

    async fn identify(&self, key: &str) -> DomainResult<String> {
        self.access.identify(key).await
    }

    async fn get_pub_conf_by_key(&self, key: &str) -> DomainResult<PubConfInfo> {
        let publisher_id = self.access.identify(key).await?;
        let profile = self.repos.profiles.retrieve_by_thing(&publisher_id).await?;

        Ok(PubConfInfo {
            publisher_id,
            profile_config: profile.config,
        })
    }

    async fn get_group_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String> {
        self.access.group_id_by_thing(thing_id).await
    }

    async fn get_profile_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String> {
        let thing = self.repos.things.retrieve_by_id(thing_id).await?;
        Ok(thing.profile_id)
    }
}
