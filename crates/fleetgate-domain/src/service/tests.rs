//! Tests for the fleet service.
//!
//! Organized by functionality:
//! - Thing lifecycle and the thing/profile group invariant
//! - Removal and cache purging
//! - Listing and membership scoping
//! - Groups and memberships
//! - Backup and restore

use fleetgate_storage::{Group, PageMetadata, Profile, Role, Thing};
use serde_json::json;

use super::{
    AccessService, BackupService, GroupMember, GroupService, MembershipService, ProfileService,
    ThingService,
};
use crate::access::{ThingAccessRequest, UserAccessRequest};
use crate::cache::{CacheConfig, Caches};
use crate::error::DomainError;
use crate::testing::{TestHarness, ADMIN_ID, ADMIN_TOKEN};

const VIEWER_TOKEN: &str = "viewer-token";
const EDITOR_TOKEN: &str = "editor-token";

fn profile(id: &str, group_id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        group_id: group_id.to_string(),
        name: format!("profile {id}"),
        config: json!({"transformer": "senml", "id": id})
            .as_object()
            .cloned()
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn thing(id: &str, group_id: &str, profile_id: &str, key: &str) -> Thing {
    Thing {
        id: id.to_string(),
        group_id: group_id.to_string(),
        profile_id: profile_id.to_string(),
        name: format!("thing {id}"),
        key: key.to_string(),
        ..Default::default()
    }
}

fn metadata(value: serde_json::Value) -> fleetgate_storage::Metadata {
    value.as_object().cloned().unwrap_or_default()
}

/// Org `o1` with groups `g1` and `g2`; 3 profiles, 5 things.
/// `u1` is a viewer of `g1`, `u2` an editor of `g2`, the admin owns both.
async fn tenant_with(caches: Caches) -> TestHarness {
    let h = TestHarness::with_caches(caches).await;
    let svc = &h.service;

    svc.create_groups(
        ADMIN_TOKEN,
        "o1",
        vec![Group::new("g1", "", "alpha"), Group::new("g2", "", "beta")],
    )
    .await
    .unwrap();
    svc.create_profiles(
        ADMIN_TOKEN,
        vec![profile("p1", "g1"), profile("p2", "g1"), profile("p3", "g2")],
    )
    .await
    .unwrap();
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
    .unwrap();

    h.add_user(VIEWER_TOKEN, "u1", "u1@example.com").await;
    h.add_user(EDITOR_TOKEN, "u2", "u2@example.com").await;
    svc.create_group_memberships(ADMIN_TOKEN, "g1", vec![GroupMember::new("u1", Role::Viewer)])
        .await
        .unwrap();
    svc.create_group_memberships(ADMIN_TOKEN, "g2", vec![GroupMember::new("u2", Role::Editor)])
        .await
        .unwrap();

    h
}

async fn tenant() -> TestHarness {
    tenant_with(Caches::in_memory(&CacheConfig::default())).await
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    let mut ids: Vec<String> = items.iter().map(|item| id(item).to_string()).collect();
    ids.sort();
    ids
}

fn all() -> PageMetadata {
    PageMetadata::new(0, 100)
}

// ============================================================
// Section 1: Thing lifecycle
// ============================================================

#[tokio::test]
async fn test_create_thing_in_profile_group() {
    let h = tenant().await;

    let created = h
        .service
        .create_things(ADMIN_TOKEN, vec![thing("", "g1", "p1", "")])
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].group_id, "g1");
    assert!(!created[0].id.is_empty());
    assert!(!created[0].key.is_empty());
    assert_ne!(created[0].id, created[0].key);
}

#[tokio::test]
async fn test_create_empty_batches_return_nothing() {
    let h = tenant().await;

    let things = h.service.create_things(ADMIN_TOKEN, Vec::new()).await.unwrap();
    assert!(things.is_empty());

    let profiles = h
        .service
        .create_profiles(ADMIN_TOKEN, Vec::new())
        .await
        .unwrap();
    assert!(profiles.is_empty());
}

#[tokio::test]
async fn test_create_thing_with_foreign_profile_is_rejected() {
    let h = tenant().await;

    let result = h
        .service
        .create_things(ADMIN_TOKEN, vec![thing("t9", "g1", "p3", "k9")])
        .await;

    assert!(matches!(result, Err(DomainError::Authorization { .. })));
    let missing = h.service.view_thing(ADMIN_TOKEN, "t9").await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_create_thing_requires_editor() {
    let h = tenant().await;

    let denied = h
        .service
        .create_things(VIEWER_TOKEN, vec![thing("t9", "g1", "p1", "k9")])
        .await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));

    h.service
        .create_things(EDITOR_TOKEN, vec![thing("t9", "g2", "p3", "k9")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_thing_with_taken_key_is_conflict() {
    let h = tenant().await;

    let result = h
        .service
        .create_things(ADMIN_TOKEN, vec![thing("t9", "g1", "p1", "k1")])
        .await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn test_update_thing_keeps_profile_in_group() {
    let h = tenant().await;

    let mut moved = thing("t1", "g1", "p3", "k1");
    moved.name = "moved".to_string();
    let result = h.service.update_thing(ADMIN_TOKEN, moved).await;
    assert!(matches!(result, Err(DomainError::Authorization { .. })));

    let mut renamed = thing("t1", "g1", "p2", "k1");
    renamed.name = "renamed".to_string();
    h.service.update_thing(ADMIN_TOKEN, renamed).await.unwrap();

    let stored = h.service.view_thing(ADMIN_TOKEN, "t1").await.unwrap();
    assert_eq!(stored.profile_id, "p2");
    assert_eq!(stored.name, "renamed");
    assert_eq!(stored.group_id, "g1");
}

#[tokio::test]
async fn test_update_metadata_merges_and_is_idempotent() {
    let h = tenant().await;
    let mut seeded = thing("t1", "g1", "p1", "k1");
    seeded.metadata = metadata(json!({"site": "north", "floor": 1}));
    h.service.update_thing(ADMIN_TOKEN, seeded).await.unwrap();

    let mut patch = thing("t1", "", "", "");
    patch.metadata = metadata(json!({"floor": 2, "rack": {"row": "b"}}));

    h.service
        .update_things_metadata(ADMIN_TOKEN, vec![patch.clone()])
        .await
        .unwrap();
    let once = h.service.view_thing(ADMIN_TOKEN, "t1").await.unwrap();

    h.service
        .update_things_metadata(ADMIN_TOKEN, vec![patch])
        .await
        .unwrap();
    let twice = h.service.view_thing(ADMIN_TOKEN, "t1").await.unwrap();

    assert_eq!(
        serde_json::Value::Object(once.metadata.clone()),
        json!({"site": "north", "floor": 2, "rack": {"row": "b"}})
    );
    assert_eq!(once.metadata, twice.metadata);
}

#[tokio::test]
async fn test_update_key_retires_old_key() {
    let h = tenant().await;
    assert_eq!(h.service.identify("k1").await.unwrap(), "t1");

    h.service.update_key(ADMIN_TOKEN, "t1", "k1-rotated").await.unwrap();

    assert!(matches!(
        h.service.identify("k1").await,
        Err(DomainError::NotFound { .. })
    ));
    assert_eq!(h.service.identify("k1-rotated").await.unwrap(), "t1");

    let taken = h.service.update_key(ADMIN_TOKEN, "t1", "k2").await;
    assert!(matches!(taken, Err(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn test_device_key_operations() {
    let h = tenant().await;

    let conf = h.service.get_pub_conf_by_key("k4").await.unwrap();
    assert_eq!(conf.publisher_id, "t4");
    assert_eq!(conf.profile_config.get("id"), Some(&json!("p3")));

    assert_eq!(h.service.get_group_id_by_thing_id("t4").await.unwrap(), "g2");
    assert_eq!(h.service.get_profile_id_by_thing_id("t4").await.unwrap(), "p3");
    assert_eq!(h.service.get_group_id_by_profile_id("p3").await.unwrap(), "g2");
    assert_eq!(
        h.service.get_config_by_thing_id("t4").await.unwrap(),
        conf.profile_config
    );
    assert!(h.service.view_metadata_by_key("k4").await.unwrap().is_empty());

    h.service
        .can_thing_access_group(&ThingAccessRequest::new("k1", "g1"))
        .await
        .unwrap();
    let foreign = h
        .service
        .can_thing_access_group(&ThingAccessRequest::new("k1", "g2"))
        .await;
    assert!(matches!(foreign, Err(DomainError::Authorization { .. })));
}

// ============================================================
// Section 2: Removal and cache purging
// ============================================================

#[tokio::test]
async fn test_removed_thing_no_longer_identifies() {
    let h = tenant().await;
    // Warm both caches
    assert_eq!(h.service.identify("k1").await.unwrap(), "t1");
    assert_eq!(h.service.get_group_id_by_thing_id("t1").await.unwrap(), "g1");

    h.service
        .remove_things(ADMIN_TOKEN, &["t1".to_string()])
        .await
        .unwrap();

    assert_eq!(h.caches.things.id("k1").await.unwrap(), None);
    assert_eq!(h.caches.things.view_group("t1").await.unwrap(), None);
    assert!(matches!(
        h.service.identify("k1").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.service
            .can_user_access_thing(&UserAccessRequest::new(ADMIN_TOKEN, "t1", Role::Viewer))
            .await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_remove_things_requires_editor() {
    let h = tenant().await;

    let denied = h
        .service
        .remove_things(VIEWER_TOKEN, &["t1".to_string()])
        .await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
    h.service.view_thing(ADMIN_TOKEN, "t1").await.unwrap();
}

#[tokio::test]
async fn test_remove_assigned_profile_fails() {
    let h = tenant().await;

    let result = h
        .service
        .remove_profiles(ADMIN_TOKEN, &["p3".to_string()])
        .await;
    assert!(matches!(result, Err(DomainError::ProfileAssigned { .. })));

    h.service
        .remove_things(ADMIN_TOKEN, &["t4".to_string(), "t5".to_string()])
        .await
        .unwrap();
    h.service
        .remove_profiles(ADMIN_TOKEN, &["p3".to_string()])
        .await
        .unwrap();

    assert_eq!(h.caches.profiles.view_group("p3").await.unwrap(), None);
    assert!(matches!(
        h.service.view_profile(ADMIN_TOKEN, "p3").await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_remove_group_cascades() {
    let h = tenant().await;
    assert_eq!(h.service.identify("k4").await.unwrap(), "t4");

    h.service
        .remove_groups(ADMIN_TOKEN, &["g2".to_string()])
        .await
        .unwrap();

    assert!(matches!(
        h.service.identify("k4").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.service.view_profile(ADMIN_TOKEN, "p3").await,
        Err(DomainError::NotFound { .. })
    ));

    // u2 only belonged to g2
    let visible = h.service.list_things(EDITOR_TOKEN, &all()).await.unwrap();
    assert_eq!(visible.total, 0);
}

#[tokio::test]
async fn test_remove_group_requires_owner() {
    let h = tenant().await;

    let denied = h
        .service
        .remove_groups(EDITOR_TOKEN, &["g2".to_string()])
        .await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
}

// ============================================================
// Section 3: Listing
// ============================================================

#[tokio::test]
async fn test_admin_lists_everything() {
    let h = tenant().await;

    assert_eq!(h.service.list_things(ADMIN_TOKEN, &all()).await.unwrap().total, 5);
    assert_eq!(h.service.list_profiles(ADMIN_TOKEN, &all()).await.unwrap().total, 3);
    assert_eq!(h.service.list_groups(ADMIN_TOKEN, &all()).await.unwrap().total, 2);
    assert_eq!(
        h.service
            .list_things_by_org(ADMIN_TOKEN, "o1", &all())
            .await
            .unwrap()
            .total,
        5
    );
}

#[tokio::test]
async fn test_member_lists_only_own_groups() {
    let h = tenant().await;

    let things = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(ids(&things.items, |t| t.id.as_str()), vec!["t1", "t2", "t3"]);

    let profiles = h.service.list_profiles(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(ids(&profiles.items, |p| p.id.as_str()), vec!["p1", "p2"]);

    let groups = h.service.list_groups(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(ids(&groups.items, |g| g.id.as_str()), vec!["g1"]);
}

#[tokio::test]
async fn test_org_listing_is_scoped_to_direct_memberships() {
    let h = tenant().await;
    // Owning the org passes the org check but does not widen the scope
    h.auth.set_org_role("o1", "u1", Role::Owner).await;

    let things = h
        .service
        .list_things_by_org(VIEWER_TOKEN, "o1", &all())
        .await
        .unwrap();
    assert_eq!(ids(&things.items, |t| t.id.as_str()), vec!["t1", "t2", "t3"]);

    let profiles = h
        .service
        .list_profiles_by_org(VIEWER_TOKEN, "o1", &all())
        .await
        .unwrap();
    assert_eq!(ids(&profiles.items, |p| p.id.as_str()), vec!["p1", "p2"]);

    let groups = h
        .service
        .list_groups_by_org(VIEWER_TOKEN, "o1", &all())
        .await
        .unwrap();
    assert_eq!(ids(&groups.items, |g| g.id.as_str()), vec!["g1"]);
}

#[tokio::test]
async fn test_org_listing_requires_org_viewer() {
    let h = tenant().await;

    let denied = h.service.list_things_by_org(VIEWER_TOKEN, "o1", &all()).await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
}

#[tokio::test]
async fn test_list_by_group_and_profile() {
    let h = tenant().await;

    let by_group = h
        .service
        .list_things_by_group(VIEWER_TOKEN, "g1", &PageMetadata::new(0, 2))
        .await
        .unwrap();
    assert_eq!(by_group.total, 3);
    assert_eq!(by_group.items.len(), 2);

    let by_profile = h
        .service
        .list_things_by_profile(VIEWER_TOKEN, "p1", &all())
        .await
        .unwrap();
    assert_eq!(ids(&by_profile.items, |t| t.id.as_str()), vec!["t1", "t2"]);

    let profiles = h
        .service
        .list_profiles_by_group(VIEWER_TOKEN, "g1", &all())
        .await
        .unwrap();
    assert_eq!(profiles.total, 2);

    let denied = h
        .service
        .list_things_by_group(VIEWER_TOKEN, "g2", &all())
        .await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
}

#[tokio::test]
async fn test_view_by_relation() {
    let h = tenant().await;

    let profile = h.service.view_profile_by_thing(VIEWER_TOKEN, "t3").await.unwrap();
    assert_eq!(profile.id, "p2");

    let group = h.service.view_group_by_thing(VIEWER_TOKEN, "t1").await.unwrap();
    assert_eq!(group.id, "g1");
    assert_eq!(group.org_id, "o1");

    let group = h.service.view_group_by_profile(VIEWER_TOKEN, "p1").await.unwrap();
    assert_eq!(group.id, "g1");

    let denied = h.service.view_group_by_thing(VIEWER_TOKEN, "t4").await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
}

// ============================================================
// Section 4: Groups and memberships
// ============================================================

#[tokio::test]
async fn test_group_creator_becomes_owner() {
    let h = tenant().await;
    h.auth.set_org_role("o1", "u2", Role::Editor).await;

    // Cache u2's memberships before the new group exists
    let before = h.service.list_groups(EDITOR_TOKEN, &all()).await.unwrap();
    assert_eq!(before.total, 1);

    let created = h
        .service
        .create_groups(EDITOR_TOKEN, "o1", vec![Group::new("", "ignored", "gamma")])
        .await
        .unwrap();
    let gamma = &created[0];
    assert_eq!(gamma.org_id, "o1");

    let after = h.service.list_groups(EDITOR_TOKEN, &all()).await.unwrap();
    assert_eq!(after.total, 2);

    h.service
        .can_user_access_group(&UserAccessRequest::new(EDITOR_TOKEN, &gamma.id, Role::Owner))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_group_batch_keeps_creator_listing_fresh() {
    let h = tenant().await;
    h.auth.set_org_role("o1", "u2", Role::Editor).await;

    let before = h.service.list_groups(EDITOR_TOKEN, &all()).await.unwrap();
    assert_eq!(ids(&before.items, |g| g.id.as_str()), vec!["g2"]);

    // The second group reuses an existing ID, so the batch stops there
    let result = h
        .service
        .create_groups(
            EDITOR_TOKEN,
            "o1",
            vec![Group::new("g7", "", "gamma"), Group::new("g1", "", "taken")],
        )
        .await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));

    let after = h.service.list_groups(EDITOR_TOKEN, &all()).await.unwrap();
    assert_eq!(ids(&after.items, |g| g.id.as_str()), vec!["g2", "g7"]);
}

#[tokio::test]
async fn test_create_group_requires_org_editor() {
    let h = tenant().await;

    let denied = h
        .service
        .create_groups(VIEWER_TOKEN, "o1", vec![Group::new("", "", "gamma")])
        .await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));
}

#[tokio::test]
async fn test_update_group_keeps_org() {
    let h = tenant().await;
    let mut group = h.service.view_group(ADMIN_TOKEN, "g1").await.unwrap();
    let created_at = group.created_at;
    group.org_id = "o2".to_string();
    group.description = "updated".to_string();

    let updated = h.service.update_group(ADMIN_TOKEN, group).await.unwrap();

    assert_eq!(updated.org_id, "o1");
    assert_eq!(updated.description, "updated");
    assert_eq!(updated.created_at, created_at);
    assert!(updated.updated_at >= created_at);
}

#[tokio::test]
async fn test_membership_lifecycle() {
    let h = tenant().await;

    let duplicate = h
        .service
        .create_group_memberships(ADMIN_TOKEN, "g1", vec![GroupMember::new("u1", Role::Admin)])
        .await;
    assert!(matches!(duplicate, Err(DomainError::Conflict { .. })));

    let page = h
        .service
        .list_group_memberships(VIEWER_TOKEN, "g1", &all())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let viewer = page.items.iter().find(|m| m.member_id == "u1").unwrap();
    assert_eq!(viewer.email.as_deref(), Some("u1@example.com"));

    // Promote u1, then u1 can edit things in g1
    h.service
        .update_group_memberships(ADMIN_TOKEN, "g1", vec![GroupMember::new("u1", Role::Editor)])
        .await
        .unwrap();
    h.service
        .can_user_access_thing(&UserAccessRequest::new(VIEWER_TOKEN, "t1", Role::Editor))
        .await
        .unwrap();

    let before = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(before.total, 3);

    h.service
        .remove_group_memberships(ADMIN_TOKEN, "g1", &["u1".to_string()])
        .await
        .unwrap();

    let after = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(after.total, 0);
}

#[tokio::test]
async fn test_new_membership_widens_listing() {
    let h = tenant().await;
    let before = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(before.total, 3);

    h.service
        .create_group_memberships(ADMIN_TOKEN, "g2", vec![GroupMember::new("u1", Role::Viewer)])
        .await
        .unwrap();

    let after = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(after.total, 5);
}

#[tokio::test]
async fn test_membership_in_missing_group_is_not_found() {
    let h = tenant().await;

    let result = h
        .service
        .create_group_memberships(ADMIN_TOKEN, "nope", vec![GroupMember::new("u1", Role::Viewer)])
        .await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

// ============================================================
// Section 5: Backup and restore
// ============================================================

#[tokio::test]
async fn test_full_backup_counts_and_emails() {
    let h = tenant().await;

    let backup = h.service.backup(ADMIN_TOKEN).await.unwrap();

    assert_eq!(backup.groups.len(), 2);
    assert_eq!(backup.profiles.len(), 3);
    assert_eq!(backup.things.len(), 5);
    assert_eq!(backup.group_memberships.len(), 4);
    assert!(backup.group_memberships.iter().all(|m| m.email.is_some()));
    assert!(backup
        .group_memberships
        .iter()
        .any(|m| m.member_id == ADMIN_ID && m.role == Role::Owner));
}

#[tokio::test]
async fn test_backup_requires_admin() {
    let h = tenant().await;

    let result = h.service.backup(EDITOR_TOKEN).await;
    assert!(matches!(result, Err(DomainError::Authorization { .. })));

    let result = h
        .service
        .restore(EDITOR_TOKEN, Default::default())
        .await;
    assert!(matches!(result, Err(DomainError::Authorization { .. })));
}

#[tokio::test]
async fn test_backup_restore_backup_is_identity() {
    let source = tenant().await;
    let backup = source.service.backup(ADMIN_TOKEN).await.unwrap();

    let target = TestHarness::new().await;
    target.users.add_user("u1", "u1@example.com").await;
    target.users.add_user("u2", "u2@example.com").await;

    target
        .service
        .restore(ADMIN_TOKEN, backup.clone())
        .await
        .unwrap();
    let restored = target.service.backup(ADMIN_TOKEN).await.unwrap();

    assert_eq!(restored, backup);
    assert_eq!(target.service.identify("k5").await.unwrap(), "t5");
}

#[tokio::test]
async fn test_restore_twice_conflicts_and_keeps_first() {
    let source = tenant().await;
    let backup = source.service.backup(ADMIN_TOKEN).await.unwrap();

    let result = source.service.restore(ADMIN_TOKEN, backup.clone()).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));

    let unchanged = source.service.backup(ADMIN_TOKEN).await.unwrap();
    assert_eq!(unchanged, backup);
}

#[tokio::test]
async fn test_scoped_backups() {
    let h = tenant().await;
    h.auth.set_org_role("o1", "u1", Role::Owner).await;

    let groups = h.service.backup_groups_by_org(VIEWER_TOKEN, "o1").await.unwrap();
    assert_eq!(groups.len(), 2);
    let things = h.service.backup_things_by_org(VIEWER_TOKEN, "o1").await.unwrap();
    assert_eq!(things.len(), 5);
    let profiles = h.service.backup_profiles_by_org(VIEWER_TOKEN, "o1").await.unwrap();
    assert_eq!(profiles.len(), 3);

    // u1 is only a viewer of g1
    let denied = h.service.backup_things_by_group(VIEWER_TOKEN, "g1").await;
    assert!(matches!(denied, Err(DomainError::Authorization { .. })));

    let things = h.service.backup_things_by_group(ADMIN_TOKEN, "g2").await.unwrap();
    assert_eq!(ids(&things, |t| t.id.as_str()), vec!["t4", "t5"]);
    let profiles = h.service.backup_profiles_by_group(ADMIN_TOKEN, "g2").await.unwrap();
    assert_eq!(ids(&profiles, |p| p.id.as_str()), vec!["p3"]);
    let memberships = h
        .service
        .backup_group_memberships(ADMIN_TOKEN, "g2")
        .await
        .unwrap();
    assert_eq!(memberships.len(), 2);
    assert!(memberships
        .iter()
        .any(|m| m.email.as_deref() == Some("u2@example.com")));
}

#[tokio::test]
async fn test_users_outage_fails_backup() {
    let h = tenant().await;
    h.users.set_unavailable(true);

    let result = h.service.backup(ADMIN_TOKEN).await;
    assert!(matches!(result, Err(DomainError::Internal { .. })));
}

// ============================================================
// Section 6: Caching disabled
// ============================================================

#[tokio::test]
async fn test_service_is_correct_without_cache() {
    let h = tenant_with(Caches::in_memory(&CacheConfig::default().with_enabled(false))).await;

    assert_eq!(h.service.identify("k1").await.unwrap(), "t1");
    let things = h.service.list_things(VIEWER_TOKEN, &all()).await.unwrap();
    assert_eq!(things.total, 3);

    h.service
        .remove_things(ADMIN_TOKEN, &["t1".to_string()])
        .await
        .unwrap();
    assert!(matches!(
        h.service.identify("k1").await,
        Err(DomainError::NotFound { .. })
    ));
}
