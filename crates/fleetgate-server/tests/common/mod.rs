//! Shared test utilities for fleetgate end-to-end tests.

// Each test file compiles this module separately and uses a different subset.
#![allow(dead_code)]

use std::sync::Arc;

use fleetgate_domain::testing::{
    MockAuthClient, MockUsersClient, SequentialIdProvider, ADMIN_EMAIL, ADMIN_ID, ADMIN_TOKEN,
};
use fleetgate_domain::{GroupMember, GroupService, MembershipService, ProfileService, ThingService};
use fleetgate_server::{App, AppConfig};
use fleetgate_storage::{Group, MemoryStore, PageMetadata, Profile, Role, Thing};

// =============================================================================
// Test Constants
// =============================================================================

pub const ORG_ID: &str = "o1";

/// Viewer of `g1`, org viewer of `o1`.
pub const VIEWER_TOKEN: &str = "viewer-token";
pub const VIEWER_ID: &str = "u1";

/// Editor of `g2`.
pub const EDITOR_TOKEN: &str = "editor-token";
pub const EDITOR_ID: &str = "u2";

/// The service under test plus handles on its mocks.
pub struct TestApp {
    pub app: App,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<MockAuthClient>,
    pub users: Arc<MockUsersClient>,
}

impl TestApp {
    pub async fn add_user(&self, token: &str, id: &str, email: &str) {
        self.auth.add_user(token, id, email).await;
        self.users.add_user(id, email).await;
    }
}

/// Creates an app with the default configuration.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_config(AppConfig::default()).await
}

pub async fn create_test_app_with_config(config: AppConfig) -> TestApp {
    let store = MemoryStore::new_shared();
    let auth = Arc::new(MockAuthClient::new(store.clone()));
    let users = Arc::new(MockUsersClient::new());

    auth.add_admin(ADMIN_TOKEN, ADMIN_ID, ADMIN_EMAIL).await;
    users.add_user(ADMIN_ID, ADMIN_EMAIL).await;

    let app = App::builder(config)
        .with_store(store.clone())
        .with_auth(auth.clone())
        .with_users(users.clone())
        .with_ids(Arc::new(SequentialIdProvider::default()))
        .build()
        .expect("test app should build");

    TestApp {
        app,
        store,
        auth,
        users,
    }
}

pub fn profile(id: &str, group_id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        group_id: group_id.to_string(),
        name: format!("profile {id}"),
        ..Default::default()
    }
}

pub fn thing(id: &str, group_id: &str, profile_id: &str, key: &str) -> Thing {
    Thing {
        id: id.to_string(),
        group_id: group_id.to_string(),
        profile_id: profile_id.to_string(),
        name: format!("thing {id}"),
        key: key.to_string(),
        ..Default::default()
    }
}

pub fn all() -> PageMetadata {
    PageMetadata::new(0, 100)
}

pub fn sorted_ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    let mut ids: Vec<String> = items.iter().map(|item| id(item).to_string()).collect();
    ids.sort();
    ids
}

/// One org, 2 groups, 3 profiles, 5 things and 4 memberships.
///
/// | group | profiles | things (key)                 | members                |
/// |-------|----------|------------------------------|------------------------|
/// | g1    | p1, p2   | t1 (k1), t2 (k2), t3 (k3)    | admin owner, u1 viewer |
/// | g2    | p3       | t4 (k4), t5 (k5)             | admin owner, u2 editor |
pub async fn seed_tenant(t: &TestApp) {
    let svc = &t.app.service;

    svc.create_groups(
        ADMIN_TOKEN,
        ORG_ID,
        vec![Group::new("g1", "", "alpha"), Group::new("g2", "", "beta")],
    )
    .await
    .expect("groups");
    svc.create_profiles(
        ADMIN_TOKEN,
        vec![profile("p1", "g1"), profile("p2", "g1"), profile("p3", "g2")],
    )
    .await
    .expect("profiles");
    svc.create_things(
        ADMIN_TOKEN,
        vec![
            thing("t1", "g1", "p1", "k1"),
            thing("t2", "g1", "p1", "k2"),
            thing("t3", "g1", "p2", "k3"),
            thing("t4", "g2", "p3", "k4"),
            thing("t5", "g2", "p3", "k5"),
        ],
    )
    .await
    .expect("things");

    t.add_user(VIEWER_TOKEN, VIEWER_ID, "u1@example.com").await;
    t.add_user(EDITOR_TOKEN, EDITOR_ID, "u2@example.com").await;
    t.auth.set_org_role(ORG_ID, VIEWER_ID, Role::Viewer).await;

    svc.create_group_memberships(
        ADMIN_TOKEN,
        "g1",
        vec![GroupMember::new(VIEWER_ID, Role::Viewer)],
    )
    .await
    .expect("g1 memberships");
    svc.create_group_memberships(
        ADMIN_TOKEN,
        "g2",
        vec![GroupMember::new(EDITOR_ID, Role::Editor)],
    )
    .await
    .expect("g2 memberships");
}
