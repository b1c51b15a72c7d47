//! Call metrics decorator.
//!
//! # Metrics Emitted
//!
//! - `fleetgate_service_requests_total` - Counter with labels: method, status
//! - `fleetgate_service_request_duration_seconds` - Histogram with labels: method, status
//!
//! `status` is `ok` or `error`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fleetgate_domain::{
    AccessService, Backup, BackupService, DomainResult, GroupMember, GroupService,
    MembershipService, ProfileService, PubConfInfo, Service, ThingAccessRequest, ThingService,
    UserAccessRequest,
};
use fleetgate_storage::{
    Group, GroupMembership, GroupMembershipsPage, GroupsPage, Metadata, PageMetadata, Profile,
    ProfilesPage, Thing, ThingsPage,
};

/// Collected call metrics.
///
/// Calls are counted twice: in atomic counters that tests can read back,
/// and through the `metrics` facade for Prometheus export.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    request_count: AtomicU64,
    error_count: AtomicU64,
    total_duration_us: AtomicU64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call of `method`.
    pub fn record(&self, method: &'static str, ok: bool, duration_us: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us
            .fetch_add(duration_us, Ordering::Relaxed);
        if !ok {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }

        let labels = [
            ("method", method.to_string()),
            ("status", if ok { "ok" } else { "error" }.to_string()),
        ];
        metrics::counter!("fleetgate_service_requests_total", &labels).increment(1);
        metrics::histogram!("fleetgate_service_request_duration_seconds", &labels)
            .record(duration_us as f64 / 1_000_000.0);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn success_count(&self) -> u64 {
        self.request_count() - self.error_count()
    }

    pub fn total_duration_us(&self) -> u64 {
        self.total_duration_us.load(Ordering::Relaxed)
    }

    /// Average call duration. Use the histogram for percentiles.
    pub fn avg_duration_us(&self) -> u64 {
        match self.request_count() {
            0 => 0,
            count => self.total_duration_us() / count,
        }
    }
}

/// Records metrics for every call to the wrapped service.
#[derive(Clone)]
pub struct MetricsService {
    inner: Arc<dyn Service>,
    metrics: Arc<ServiceMetrics>,
}

impl MetricsService {
    pub fn new(inner: Arc<dyn Service>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> Arc<ServiceMetrics> {
        Arc::clone(&self.metrics)
    }

    async fn observe<T, F>(&self, method: &'static str, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>> + Send,
    {
        let start = Instant::now();
        let result = fut.await;
        self.metrics
            .record(method, result.is_ok(), start.elapsed().as_micros() as u64);
        result
    }
}

#[async_trait]
impl ThingService for MetricsService {
    async fn create_things(&self, token: &str, things: Vec<Thing>) -> DomainResult<Vec<Thing>> {
        self.observe("create_things", self.inner.create_things(token, things))
            .await
    }

    async fn update_thing(&self, token: &str, thing: Thing) -> DomainResult<()> {
        self.observe("update_thing", self.inner.update_thing(token, thing))
            .await
    }

    async fn update_things_metadata(&self, token: &str, things: Vec<Thing>) -> DomainResult<()> {
        self.observe(
            "update_things_metadata",
            self.inner.update_things_metadata(token, things),
        )
        .await
    }

    async fn update_key(&self, token: &str, id: &str, key: &str) -> DomainResult<()> {
        self.observe("update_key", self.inner.update_key(token, id, key))
            .await
    }

    async fn view_thing(&self, token: &str, id: &str) -> DomainResult<Thing> {
        self.observe("view_thing", self.inner.view_thing(token, id))
            .await
    }

    async fn view_metadata_by_key(&self, key: &str) -> DomainResult<Metadata> {
        self.observe("view_metadata_by_key", self.inner.view_metadata_by_key(key))
            .await
    }

    async fn list_things(&self, token: &str, pm: &PageMetadata) -> DomainResult<ThingsPage> {
        self.observe("list_things", self.inner.list_things(token, pm))
            .await
    }

    async fn list_things_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        self.observe(
            "list_things_by_org",
            self.inner.list_things_by_org(token, org_id, pm),
        )
        .await
    }

    async fn list_things_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        self.observe(
            "list_things_by_group",
            self.inner.list_things_by_group(token, group_id, pm),
        )
        .await
    }

    async fn list_things_by_profile(
        &self,
        token: &str,
        profile_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ThingsPage> {
        self.observe(
            "list_things_by_profile",
            self.inner.list_things_by_profile(token, profile_id, pm),
        )
        .await
    }

    async fn remove_things(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        self.observe("remove_things", self.inner.remove_things(token, ids))
            .await
    }

    async fn identify(&self, key: &str) -> DomainResult<String> {
        self.observe("identify", self.inner.identify(key)).await
    }

    async fn get_pub_conf_by_key(&self, key: &str) -> DomainResult<PubConfInfo> {
        self.observe("get_pub_conf_by_key", self.inner.get_pub_conf_by_key(key))
            .await
    }

    async fn get_group_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String> {
        self.observe(
            "get_group_id_by_thing_id",
            self.inner.get_group_id_by_thing_id(thing_id),
        )
        .await
    }

    async fn get_profile_id_by_thing_id(&self, thing_id: &str) -> DomainResult<String> {
        self.observe(
            "get_profile_id_by_thing_id",
            self.inner.get_profile_id_by_thing_id(thing_id),
        )
        .await
    }
}

#[async_trait]
impl ProfileService for MetricsService {
    async fn create_profiles(
        &self,
        token: &str,
        profiles: Vec<Profile>,
    ) -> DomainResult<Vec<Profile>> {
        self.observe("create_profiles", self.inner.create_profiles(token, profiles))
            .await
    }

    async fn update_profile(&self, token: &str, profile: Profile) -> DomainResult<()> {
        self.observe("update_profile", self.inner.update_profile(token, profile))
            .await
    }

    async fn view_profile(&self, token: &str, id: &str) -> DomainResult<Profile> {
        self.observe("view_profile", self.inner.view_profile(token, id))
            .await
    }

    async fn view_profile_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Profile> {
        self.observe(
            "view_profile_by_thing",
            self.inner.view_profile_by_thing(token, thing_id),
        )
        .await
    }

    async fn list_profiles(&self, token: &str, pm: &PageMetadata) -> DomainResult<ProfilesPage> {
        self.observe("list_profiles", self.inner.list_profiles(token, pm))
            .await
    }

    async fn list_profiles_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage> {
        self.observe(
            "list_profiles_by_org",
            self.inner.list_profiles_by_org(token, org_id, pm),
        )
        .await
    }

    async fn list_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<ProfilesPage> {
        self.observe(
            "list_profiles_by_group",
            self.inner.list_profiles_by_group(token, group_id, pm),
        )
        .await
    }

    async fn remove_profiles(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        self.observe("remove_profiles", self.inner.remove_profiles(token, ids))
            .await
    }

    async fn get_config_by_thing_id(&self, thing_id: &str) -> DomainResult<Metadata> {
        self.observe(
            "get_config_by_thing_id",
            self.inner.get_config_by_thing_id(thing_id),
        )
        .await
    }

    async fn get_group_id_by_profile_id(&self, profile_id: &str) -> DomainResult<String> {
        self.observe(
            "get_group_id_by_profile_id",
            self.inner.get_group_id_by_profile_id(profile_id),
        )
        .await
    }
}

#[async_trait]
impl GroupService for MetricsService {
    async fn create_groups(
        &self,
        token: &str,
        org_id: &str,
        groups: Vec<Group>,
    ) -> DomainResult<Vec<Group>> {
        self.observe("create_groups", self.inner.create_groups(token, org_id, groups))
            .await
    }

    async fn update_group(&self, token: &str, group: Group) -> DomainResult<Group> {
        self.observe("update_group", self.inner.update_group(token, group))
            .await
    }

    async fn view_group(&self, token: &str, id: &str) -> DomainResult<Group> {
        self.observe("view_group", self.inner.view_group(token, id))
            .await
    }

    async fn view_group_by_thing(&self, token: &str, thing_id: &str) -> DomainResult<Group> {
        self.observe(
            "view_group_by_thing",
            self.inner.view_group_by_thing(token, thing_id),
        )
        .await
    }

    async fn view_group_by_profile(&self, token: &str, profile_id: &str) -> DomainResult<Group> {
        self.observe(
            "view_group_by_profile",
            self.inner.view_group_by_profile(token, profile_id),
        )
        .await
    }

    async fn list_groups(&self, token: &str, pm: &PageMetadata) -> DomainResult<GroupsPage> {
        self.observe("list_groups", self.inner.list_groups(token, pm))
            .await
    }

    async fn list_groups_by_org(
        &self,
        token: &str,
        org_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupsPage> {
        self.observe(
            "list_groups_by_org",
            self.inner.list_groups_by_org(token, org_id, pm),
        )
        .await
    }

    async fn remove_groups(&self, token: &str, ids: &[String]) -> DomainResult<()> {
        self.observe("remove_groups", self.inner.remove_groups(token, ids))
            .await
    }
}

#[async_trait]
impl MembershipService for MetricsService {
    async fn create_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()> {
        self.observe(
            "create_group_memberships",
            self.inner.create_group_memberships(token, group_id, members),
        )
        .await
    }

    async fn list_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        pm: &PageMetadata,
    ) -> DomainResult<GroupMembershipsPage> {
        self.observe(
            "list_group_memberships",
            self.inner.list_group_memberships(token, group_id, pm),
        )
        .await
    }

    async fn update_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> DomainResult<()> {
        self.observe(
            "update_group_memberships",
            self.inner.update_group_memberships(token, group_id, members),
        )
        .await
    }

    async fn remove_group_memberships(
        &self,
        token: &str,
        group_id: &str,
        member_ids: &[String],
    ) -> DomainResult<()> {
        self.observe(
            "remove_group_memberships",
            self.inner.remove_group_memberships(token, group_id, member_ids),
        )
        .await
    }
}

#[async_trait]
impl BackupService for MetricsService {
    async fn backup(&self, token: &str) -> DomainResult<Backup> {
        self.observe("backup", self.inner.backup(token)).await
    }

    async fn backup_groups_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Group>> {
        self.observe(
            "backup_groups_by_org",
            self.inner.backup_groups_by_org(token, org_id),
        )
        .await
    }

    async fn backup_things_by_org(&self, token: &str, org_id: &str) -> DomainResult<Vec<Thing>> {
        self.observe(
            "backup_things_by_org",
            self.inner.backup_things_by_org(token, org_id),
        )
        .await
    }

    async fn backup_profiles_by_org(
        &self,
        token: &str,
        org_id: &str,
    ) -> DomainResult<Vec<Profile>> {
        self.observe(
            "backup_profiles_by_org",
            self.inner.backup_profiles_by_org(token, org_id),
        )
        .await
    }

    async fn backup_things_by_group(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<Thing>> {
        self.observe(
            "backup_things_by_group",
            self.inner.backup_things_by_group(token, group_id),
        )
        .await
    }

    async fn backup_profiles_by_group(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<Profile>> {
        self.observe(
            "backup_profiles_by_group",
            self.inner.backup_profiles_by_group(token, group_id),
        )
        .await
    }

    async fn backup_group_memberships(
        &self,
        token: &str,
        group_id: &str,
    ) -> DomainResult<Vec<GroupMembership>> {
        self.observe(
            "backup_group_memberships",
            self.inner.backup_group_memberships(token, group_id),
        )
        .await
    }

    async fn restore(&self, token: &str, backup: Backup) -> DomainResult<()> {
        self.observe("restore", self.inner.restore(token, backup))
            .await
    }
}

#[async_trait]
impl AccessService for MetricsService {
    async fn can_user_access_thing(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.observe(
            "can_user_access_thing",
            self.inner.can_user_access_thing(req),
        )
        .await
    }

    async fn can_user_access_profile(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.observe(
            "can_user_access_profile",
            self.inner.can_user_access_profile(req),
        )
        .await
    }

    async fn can_user_access_group(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.observe(
            "can_user_access_group",
            self.inner.can_user_access_group(req),
        )
        .await
    }

    async fn can_user_access_org(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.observe("can_user_access_org", self.inner.can_user_access_org(req))
            .await
    }

    async fn can_thing_access_group(&self, req: &ThingAccessRequest) -> DomainResult<()> {
        self.observe(
            "can_thing_access_group",
            self.inner.can_thing_access_group(req),
        )
        .await
    }
}
