//! In-memory repository implementation.
//!
//! A single [`MemoryStore`] implements all four repository traits so that
//! cross-entity rules (key uniqueness, profile assignment checks, cascading
//! group removal) can be enforced without a database.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{StorageError, StorageResult};
use crate::models::{
    EntityKind, Group, GroupMembership, GroupMembershipsPage, GroupsPage, PageMetadata, Profile,
    ProfilesPage, Role, Thing, ThingsPage,
};
use crate::traits::{
    GroupMembershipsRepository, GroupRepository, ProfileRepository, ThingRepository,
};

/// In-memory implementation of every repository trait.
///
/// # Performance Characteristics
///
/// - **Lookup by ID or key**: O(1) (DashMap lookup)
/// - **List / backup**: O(N) linear scan plus sort
/// - **Group removal**: O(N) over things, profiles and memberships
///
/// Uses DashMap for thread-safe concurrent access. Inserts go through the
/// entry API so the existence check and the insert are a single step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    things: DashMap<String, Thing>,
    /// Thing key -> thing ID. Enforces global key uniqueness.
    thing_keys: DashMap<String, String>,
    profiles: DashMap<String, Profile>,
    groups: DashMap<String, Group>,
    /// Keyed by (group_id, member_id).
    memberships: DashMap<(String, String), GroupMembership>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn insert_thing(&self, thing: Thing) -> StorageResult<()> {
        match self.thing_keys.entry(thing.key.clone()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateKey),
            Entry::Vacant(entry) => {
                entry.insert(thing.id.clone());
            }
        }

        match self.things.entry(thing.id.clone()) {
            Entry::Occupied(_) => {
                self.thing_keys.remove(&thing.key);
                Err(StorageError::already_exists(EntityKind::Thing, &thing.id))
            }
            Entry::Vacant(entry) => {
                entry.insert(thing);
                Ok(())
            }
        }
    }

    fn remove_thing(&self, id: &str) {
        if let Some((_, thing)) = self.things.remove(id) {
            self.thing_keys.remove_if(&thing.key, |_, owner| owner == id);
        }
    }

    fn collect_things(&self, pred: impl Fn(&Thing) -> bool) -> Vec<Thing> {
        let mut items: Vec<Thing> = self
            .things
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        items
    }

    fn collect_profiles(&self, pred: impl Fn(&Profile) -> bool) -> Vec<Profile> {
        let mut items: Vec<Profile> = self
            .profiles
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        items
    }

    fn collect_groups(&self, pred: impl Fn(&Group) -> bool) -> Vec<Group> {
        let mut items: Vec<Group> = self
            .groups
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        items
    }

    fn collect_memberships(&self, pred: impl Fn(&GroupMembership) -> bool) -> Vec<GroupMembership> {
        let mut items: Vec<GroupMembership> = self
            .memberships
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| {
            a.group_id
                .cmp(&b.group_id)
                .then_with(|| a.member_id.cmp(&b.member_id))
        });
        items
    }
}

fn require(value: &str, field: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{field} cannot be empty"),
        });
    }
    Ok(())
}

fn by_id<T>(mut items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    items.sort_by(|a, b| id(a).cmp(id(b)));
    items
}

#[async_trait]
impl ThingRepository for MemoryStore {
    #[instrument(skip(self, things), fields(count = things.len()))]
    async fn save(&self, things: Vec<Thing>) -> StorageResult<Vec<Thing>> {
        for thing in &things {
            require(&thing.id, "thing id")?;
            require(&thing.key, "thing key")?;
            require(&thing.group_id, "thing group id")?;
            require(&thing.profile_id, "thing profile id")?;
        }

        let mut saved: Vec<Thing> = Vec::with_capacity(things.len());
        for thing in things {
            if let Err(err) = self.insert_thing(thing.clone()) {
                // Roll back the part of the batch that already landed.
                for prev in &saved {
                    self.remove_thing(&prev.id);
                }
                return Err(err);
            }
            saved.push(thing);
        }

        Ok(saved)
    }

    #[instrument(skip(self, thing), fields(thing_id = %thing.id))]
    async fn update(&self, thing: Thing) -> StorageResult<()> {
        let mut stored = self
            .things
            .get_mut(&thing.id)
            .ok_or_else(|| StorageError::not_found(EntityKind::Thing, &thing.id))?;

        stored.name = thing.name;
        stored.profile_id = thing.profile_id;
        stored.metadata = thing.metadata;

        Ok(())
    }

    #[instrument(skip(self, key))]
    async fn update_key(&self, id: &str, key: &str) -> StorageResult<()> {
        require(key, "thing key")?;

        let old_key = self
            .things
            .get(id)
            .map(|thing| thing.key.clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Thing, id))?;

        if old_key == key {
            return Ok(());
        }

        match self.thing_keys.entry(key.to_string()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateKey),
            Entry::Vacant(entry) => {
                entry.insert(id.to_string());
            }
        }

        match self.things.get_mut(id) {
            Some(mut thing) => thing.key = key.to_string(),
            None => {
                self.thing_keys.remove(key);
                return Err(StorageError::not_found(EntityKind::Thing, id));
            }
        }

        self.thing_keys.remove_if(&old_key, |_, owner| owner == id);
        Ok(())
    }

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Thing> {
        self.things
            .get(id)
            .map(|thing| thing.value().clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Thing, id))
    }

    async fn retrieve_by_key(&self, key: &str) -> StorageResult<String> {
        self.thing_keys
            .get(key)
            .map(|id| id.value().clone())
            .ok_or(StorageError::KeyNotFound)
    }

    async fn retrieve_by_groups(
        &self,
        group_ids: &[String],
        pm: &PageMetadata,
    ) -> StorageResult<ThingsPage> {
        if group_ids.is_empty() {
            return Ok(pm.paginate(Vec::new()));
        }

        let items = self.collect_things(|thing| {
            group_ids.contains(&thing.group_id) && pm.matches_name(&thing.name)
        });
        Ok(pm.paginate(items))
    }

    async fn retrieve_by_profile(
        &self,
        profile_id: &str,
        pm: &PageMetadata,
    ) -> StorageResult<ThingsPage> {
        let items = self
            .collect_things(|thing| thing.profile_id == profile_id && pm.matches_name(&thing.name));
        Ok(pm.paginate(items))
    }

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<ThingsPage> {
        let items = self.collect_things(|thing| pm.matches_name(&thing.name));
        Ok(pm.paginate(items))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn remove(&self, ids: &[String]) -> StorageResult<()> {
        for id in ids {
            self.remove_thing(id);
        }
        Ok(())
    }

    async fn backup_all(&self) -> StorageResult<Vec<Thing>> {
        Ok(by_id(self.collect_things(|_| true), |t| &t.id))
    }

    async fn backup_by_groups(&self, group_ids: &[String]) -> StorageResult<Vec<Thing>> {
        Ok(by_id(
            self.collect_things(|thing| group_ids.contains(&thing.group_id)),
            |t| &t.id,
        ))
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    #[instrument(skip(self, profiles), fields(count = profiles.len()))]
    async fn save(&self, profiles: Vec<Profile>) -> StorageResult<Vec<Profile>> {
        for profile in &profiles {
            require(&profile.id, "profile id")?;
            require(&profile.group_id, "profile group id")?;
        }

        let mut saved: Vec<Profile> = Vec::with_capacity(profiles.len());
        for profile in profiles {
            match self.profiles.entry(profile.id.clone()) {
                Entry::Occupied(_) => {
                    for prev in &saved {
                        self.profiles.remove(&prev.id);
                    }
                    return Err(StorageError::already_exists(EntityKind::Profile, &profile.id));
                }
                Entry::Vacant(entry) => {
                    entry.insert(profile.clone());
                }
            }
            saved.push(profile);
        }

        Ok(saved)
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    async fn update(&self, profile: Profile) -> StorageResult<()> {
        let mut stored = self
            .profiles
            .get_mut(&profile.id)
            .ok_or_else(|| StorageError::not_found(EntityKind::Profile, &profile.id))?;

        stored.name = profile.name;
        stored.config = profile.config;
        stored.metadata = profile.metadata;

        Ok(())
    }

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Profile> {
        self.profiles
            .get(id)
            .map(|profile| profile.value().clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Profile, id))
    }

    async fn retrieve_by_thing(&self, thing_id: &str) -> StorageResult<Profile> {
        let profile_id = self
            .things
            .get(thing_id)
            .map(|thing| thing.profile_id.clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Thing, thing_id))?;

        self.profiles
            .get(&profile_id)
            .map(|profile| profile.value().clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Profile, profile_id))
    }

    async fn retrieve_by_groups(
        &self,
        group_ids: &[String],
        pm: &PageMetadata,
    ) -> StorageResult<ProfilesPage> {
        if group_ids.is_empty() {
            return Ok(pm.paginate(Vec::new()));
        }

        let items = self.collect_profiles(|profile| {
            group_ids.contains(&profile.group_id) && pm.matches_name(&profile.name)
        });
        Ok(pm.paginate(items))
    }

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<ProfilesPage> {
        let items = self.collect_profiles(|profile| pm.matches_name(&profile.name));
        Ok(pm.paginate(items))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn remove(&self, ids: &[String]) -> StorageResult<()> {
        if let Some(assigned) = self
            .things
            .iter()
            .find(|thing| ids.contains(&thing.profile_id))
        {
            return Err(StorageError::ProfileAssigned {
                profile_id: assigned.profile_id.clone(),
            });
        }

        for id in ids {
            self.profiles.remove(id);
        }
        Ok(())
    }

    async fn backup_all(&self) -> StorageResult<Vec<Profile>> {
        Ok(by_id(self.collect_profiles(|_| true), |p| &p.id))
    }

    async fn backup_by_groups(&self, group_ids: &[String]) -> StorageResult<Vec<Profile>> {
        Ok(by_id(
            self.collect_profiles(|profile| group_ids.contains(&profile.group_id)),
            |p| &p.id,
        ))
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    #[instrument(skip(self, group), fields(group_id = %group.id, org_id = %group.org_id))]
    async fn save(&self, group: Group) -> StorageResult<Group> {
        require(&group.id, "group id")?;
        require(&group.org_id, "group org id")?;

        match self.groups.entry(group.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::already_exists(EntityKind::Group, &group.id)),
            Entry::Vacant(entry) => {
                entry.insert(group.clone());
                Ok(group)
            }
        }
    }

    #[instrument(skip(self, group), fields(group_id = %group.id))]
    async fn update(&self, group: Group) -> StorageResult<Group> {
        let mut stored = self
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| StorageError::not_found(EntityKind::Group, &group.id))?;

        stored.name = group.name;
        stored.description = group.description;
        stored.metadata = group.metadata;
        stored.updated_at = group.updated_at;

        Ok(stored.clone())
    }

    async fn retrieve_by_id(&self, id: &str) -> StorageResult<Group> {
        self.groups
            .get(id)
            .map(|group| group.value().clone())
            .ok_or_else(|| StorageError::not_found(EntityKind::Group, id))
    }

    async fn retrieve_by_ids(
        &self,
        ids: &[String],
        pm: &PageMetadata,
    ) -> StorageResult<GroupsPage> {
        let items = self.collect_groups(|group| ids.contains(&group.id) && pm.matches_name(&group.name));
        Ok(pm.paginate(items))
    }

    async fn retrieve_by_org(&self, org_id: &str, pm: &PageMetadata) -> StorageResult<GroupsPage> {
        let items =
            self.collect_groups(|group| group.org_id == org_id && pm.matches_name(&group.name));
        Ok(pm.paginate(items))
    }

    async fn retrieve_all(&self, pm: &PageMetadata) -> StorageResult<GroupsPage> {
        let items = self.collect_groups(|group| pm.matches_name(&group.name));
        Ok(pm.paginate(items))
    }

    async fn retrieve_ids_by_org(&self, org_id: &str) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .groups
            .iter()
            .filter(|group| group.org_id == org_id)
            .map(|group| group.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn retrieve_ids_by_org_membership(
        &self,
        org_id: &str,
        member_id: &str,
    ) -> StorageResult<Vec<String>> {
        let org_group_ids = self.retrieve_ids_by_org(org_id).await?;

        Ok(org_group_ids
            .into_iter()
            .filter(|group_id| {
                self.memberships
                    .contains_key(&(group_id.clone(), member_id.to_string()))
            })
            .collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn remove(&self, ids: &[String]) -> StorageResult<()> {
        for id in ids {
            if self.groups.remove(id).is_none() {
                continue;
            }

            let owned_things: Vec<String> = self
                .things
                .iter()
                .filter(|thing| &thing.group_id == id)
                .map(|thing| thing.id.clone())
                .collect();
            for thing_id in &owned_things {
                self.remove_thing(thing_id);
            }

            self.profiles.retain(|_, profile| &profile.group_id != id);
            self.memberships.retain(|(group_id, _), _| group_id != id);
        }
        Ok(())
    }

    async fn backup_all(&self) -> StorageResult<Vec<Group>> {
        Ok(by_id(self.collect_groups(|_| true), |g| &g.id))
    }

    async fn backup_by_org(&self, org_id: &str) -> StorageResult<Vec<Group>> {
        Ok(by_id(
            self.collect_groups(|group| group.org_id == org_id),
            |g| &g.id,
        ))
    }
}

#[async_trait]
impl GroupMembershipsRepository for MemoryStore {
    #[instrument(skip(self, memberships), fields(count = memberships.len()))]
    async fn save(&self, memberships: Vec<GroupMembership>) -> StorageResult<()> {
        for membership in &memberships {
            require(&membership.member_id, "member id")?;
            require(&membership.group_id, "group id")?;
        }

        let mut saved: Vec<(String, String)> = Vec::with_capacity(memberships.len());
        for mut membership in memberships {
            membership.email = None;
            let key = (membership.group_id.clone(), membership.member_id.clone());
            match self.memberships.entry(key.clone()) {
                Entry::Occupied(_) => {
                    for prev in &saved {
                        self.memberships.remove(prev);
                    }
                    return Err(StorageError::already_exists(
                        EntityKind::GroupMembership,
                        format!("{}/{}", key.0, key.1),
                    ));
                }
                Entry::Vacant(entry) => {
                    entry.insert(membership);
                }
            }
            saved.push(key);
        }

        Ok(())
    }

    #[instrument(skip(self, memberships), fields(count = memberships.len()))]
    async fn update(&self, memberships: Vec<GroupMembership>) -> StorageResult<()> {
        for membership in &memberships {
            let key = (membership.group_id.clone(), membership.member_id.clone());
            if !self.memberships.contains_key(&key) {
                return Err(StorageError::not_found(
                    EntityKind::GroupMembership,
                    format!("{}/{}", key.0, key.1),
                ));
            }
        }

        for membership in memberships {
            let key = (membership.group_id, membership.member_id);
            if let Some(mut stored) = self.memberships.get_mut(&key) {
                stored.role = membership.role;
                stored.updated_at = membership.updated_at;
            }
        }

        Ok(())
    }

    async fn retrieve_role(&self, group_id: &str, member_id: &str) -> StorageResult<Role> {
        self.memberships
            .get(&(group_id.to_string(), member_id.to_string()))
            .map(|membership| membership.role)
            .ok_or_else(|| {
                StorageError::not_found(
                    EntityKind::GroupMembership,
                    format!("{group_id}/{member_id}"),
                )
            })
    }

    async fn retrieve_by_group(
        &self,
        group_id: &str,
        pm: &PageMetadata,
    ) -> StorageResult<GroupMembershipsPage> {
        let items = self.collect_memberships(|membership| membership.group_id == group_id);
        Ok(pm.paginate(items))
    }

    async fn retrieve_group_ids_by_member(&self, member_id: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .collect_memberships(|membership| membership.member_id == member_id)
            .into_iter()
            .map(|membership| membership.group_id)
            .collect())
    }

    #[instrument(skip(self, member_ids), fields(count = member_ids.len()))]
    async fn remove(&self, group_id: &str, member_ids: &[String]) -> StorageResult<()> {
        for member_id in member_ids {
            self.memberships
                .remove(&(group_id.to_string(), member_id.clone()));
        }
        Ok(())
    }

    async fn backup_all(&self) -> StorageResult<Vec<GroupMembership>> {
        Ok(self.collect_memberships(|_| true))
    }

    async fn backup_by_group(&self, group_id: &str) -> StorageResult<Vec<GroupMembership>> {
        Ok(self.collect_memberships(|membership| membership.group_id == group_id))
    }
}
