//! In-process test doubles for the external collaborators.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetgate_storage::{GroupMembershipsRepository, MemoryStore, Role};
use tokio::sync::RwLock;

use crate::access::AccessConfig;
use crate::cache::{CacheConfig, CacheError, CacheResult, Caches, GroupCache, ResourceCache};
use crate::clients::{
    AuthClient, AuthorizeRequest, ClientError, ClientResult, IdProvider, Identity, Subject, User,
    UsersClient,
};
use crate::service::FleetService;
use crate::stores::Repositories;

/// Mock authorization service.
///
/// Group roles are read from a memberships repository so that memberships
/// created through the service take effect immediately. Org roles and
/// admins are configured explicitly.
pub struct MockAuthClient {
    identities: RwLock<HashMap<String, Identity>>,
    admins: RwLock<HashSet<String>>,
    /// (org_id, member_id) -> role
    org_roles: RwLock<HashMap<(String, String), Role>>,
    memberships: Arc<dyn GroupMembershipsRepository>,
    latency: RwLock<Option<Duration>>,
    unavailable: AtomicBool,
    authorize_calls: AtomicU64,
}

impl MockAuthClient {
    pub fn new(memberships: Arc<dyn GroupMembershipsRepository>) -> Self {
        Self {
            identities: RwLock::new(HashMap::new()),
            admins: RwLock::new(HashSet::new()),
            org_roles: RwLock::new(HashMap::new()),
            memberships,
            latency: RwLock::new(None),
            unavailable: AtomicBool::new(false),
            authorize_calls: AtomicU64::new(0),
        }
    }

    pub async fn add_user(&self, token: &str, id: &str, email: &str) {
        self.identities.write().await.insert(
            token.to_string(),
            Identity {
                id: id.to_string(),
                email: email.to_string(),
            },
        );
    }

    pub async fn add_admin(&self, token: &str, id: &str, email: &str) {
        self.add_user(token, id, email).await;
        self.admins.write().await.insert(token.to_string());
    }

    pub async fn set_org_role(&self, org_id: &str, member_id: &str, role: Role) {
        self.org_roles
            .write()
            .await
            .insert((org_id.to_string(), member_id.to_string()), role);
    }

    /// Delays every call by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Makes every call fail with [`ClientError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `authorize` calls received.
    pub fn authorize_calls(&self) -> u64 {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> ClientResult<()> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("auth service is down".to_string()));
        }
        Ok(())
    }

    async fn lookup(&self, token: &str) -> ClientResult<Identity> {
        self.identities
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| ClientError::Unauthenticated("unknown token".to_string()))
    }
}

#[async_trait]
impl AuthClient for MockAuthClient {
    async fn authorize(&self, req: AuthorizeRequest) -> ClientResult<()> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        let identity = self.lookup(&req.token).await?;
        let required = req.action.unwrap_or(Role::Viewer);

        let held = match req.subject {
            Subject::Root => {
                if self.admins.read().await.contains(&req.token) {
                    return Ok(());
                }
                None
            }
            Subject::Org => self
                .org_roles
                .read()
                .await
                .get(&(req.object.clone(), identity.id.clone()))
                .copied(),
            Subject::Group => self
                .memberships
                .retrieve_role(&req.object, &identity.id)
                .await
                .ok(),
        };

        match held {
            Some(role) if role.grants(required) => Ok(()),
            _ => Err(ClientError::PermissionDenied(format!(
                "{} lacks {} on {} {}",
                identity.id, required, req.subject, req.object
            ))),
        }
    }

    async fn identify(&self, token: &str) -> ClientResult<Identity> {
        self.enter().await?;
        self.lookup(token).await
    }
}

/// Mock users directory.
#[derive(Default)]
pub struct MockUsersClient {
    users: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MockUsersClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, id: &str, email: &str) {
        self.users
            .write()
            .await
            .insert(id.to_string(), email.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsersClient for MockUsersClient {
    async fn get_users_by_ids(
        &self,
        ids: &[String],
        email_filter: Option<&str>,
    ) -> ClientResult<Vec<User>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("users service is down".to_string()));
        }

        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                users.get(id).map(|email| User {
                    id: id.clone(),
                    email: email.clone(),
                })
            })
            .filter(|user| email_filter.map_or(true, |filter| user.email.contains(filter)))
            .collect())
    }
}

/// Deterministic ID provider: `<prefix>-0001`, `<prefix>-0002`, ...
#[derive(Debug)]
pub struct SequentialIdProvider {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdProvider {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdProvider for SequentialIdProvider {
    fn id(&self) -> ClientResult<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{:04}", self.prefix, n))
    }
}

/// Cache whose reads always miss and whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingCache;

fn injected() -> CacheError {
    CacheError::Unavailable {
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl ResourceCache for FailingCache {
    async fn id(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn save(&self, _key: &str, _id: &str) -> CacheResult<()> {
        Err(injected())
    }

    async fn remove(&self, _id: &str) -> CacheResult<()> {
        Err(injected())
    }

    async fn view_group(&self, _id: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn save_group(&self, _id: &str, _group_id: &str) -> CacheResult<()> {
        Err(injected())
    }

    async fn remove_group(&self, _id: &str) -> CacheResult<()> {
        Err(injected())
    }
}

#[async_trait]
impl GroupCache for FailingCache {
    async fn retrieve_group_ids_by_member(
        &self,
        _member_id: &str,
    ) -> CacheResult<Option<Vec<String>>> {
        Ok(None)
    }

    async fn save_group_ids_by_member(
        &self,
        _member_id: &str,
        _group_ids: &[String],
    ) -> CacheResult<()> {
        Err(injected())
    }

    async fn remove_group_ids_by_member(&self, _member_id: &str) -> CacheResult<()> {
        Err(injected())
    }

    async fn remove_group(&self, _group_id: &str) -> CacheResult<()> {
        Err(injected())
    }
}

pub const ADMIN_TOKEN: &str = "admin-token";
pub const ADMIN_ID: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// A fully wired in-memory service with mock collaborators.
///
/// The admin identity (`ADMIN_TOKEN`) is registered with both mocks.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<MockAuthClient>,
    pub users: Arc<MockUsersClient>,
    pub caches: Caches,
    pub service: Arc<FleetService>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_caches(Caches::in_memory(&CacheConfig::default())).await
    }

    pub async fn with_caches(caches: Caches) -> Self {
        Self::build(caches, AccessConfig::default()).await
    }

    pub async fn build(caches: Caches, config: AccessConfig) -> Self {
        let store = MemoryStore::new_shared();
        let repos = Repositories::in_memory(Arc::clone(&store));
        let auth = Arc::new(MockAuthClient::new(repos.memberships.clone()));
        let users = Arc::new(MockUsersClient::new());

        auth.add_admin(ADMIN_TOKEN, ADMIN_ID, ADMIN_EMAIL).await;
        users.add_user(ADMIN_ID, ADMIN_EMAIL).await;

        let service = Arc::new(FleetService::new(
            repos,
            caches.clone(),
            auth.clone(),
            users.clone(),
            Arc::new(SequentialIdProvider::default()),
            config,
        ));

        Self {
            store,
            auth,
            users,
            caches,
            service,
        }
    }

    /// Registers a regular user with both mocks.
    pub async fn add_user(&self, token: &str, id: &str, email: &str) {
        self.auth.add_user(token, id, email).await;
        self.users.add_user(id, email).await;
    }
}
