//! Moka-backed in-memory cache implementations.
//!
//! # Performance Characteristics
//!
//! - **Lookup**: O(1) hash-based
//! - **Remove by resource ID**: O(K) where K is keys mapped to that ID
//! - **Remove by group**: O(M) where M is members cached for that group
//!
//! Secondary indices (DashMap) give ID- and group-based invalidation
//! without scanning the whole cache. Entries have no TTL; `max_capacity`
//! bounds memory and an evicted entry is simply a future miss. Size
//! evictions are reported through moka's eviction listener so the indices
//! shrink with the caches they describe.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use moka::notification::RemovalCause;

use super::{record_lookup, CacheConfig, CacheKind, CacheResult, GroupCache, ResourceCache};

/// In-memory [`ResourceCache`].
///
/// # Thread Safety
///
/// Fully thread-safe; share one instance across all async tasks.
pub struct MemoryResourceCache {
    kind: CacheKind,
    enabled: bool,
    /// key -> resource ID
    keys: Cache<String, String>,
    /// Secondary index: resource ID -> keys mapped to it.
    keys_by_id: Arc<DashMap<String, HashSet<String>>>,
    /// resource ID -> group ID
    groups: Cache<String, String>,
}

impl std::fmt::Debug for MemoryResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryResourceCache")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("key_count", &self.keys.entry_count())
            .field("group_count", &self.groups.entry_count())
            .finish()
    }
}

/// Removes `value` from the set stored under `key`, dropping the set once empty.
fn unindex(index: &DashMap<String, HashSet<String>>, key: &str, value: &str) {
    let now_empty = match index.get_mut(key) {
        Some(mut values) => {
            values.remove(value);
            values.is_empty()
        }
        None => false,
    };
    // The shard guard above is released before re-locking for removal.
    if now_empty {
        index.remove_if(key, |_, values| values.is_empty());
    }
}

fn indexed(index: &DashMap<String, HashSet<String>>, key: &str, value: &str) -> bool {
    index
        .get(key)
        .is_some_and(|values| values.contains(value))
}

impl MemoryResourceCache {
    pub fn new(kind: CacheKind, config: &CacheConfig) -> Self {
        let keys_by_id: Arc<DashMap<String, HashSet<String>>> = Arc::new(DashMap::new());
        let index = Arc::clone(&keys_by_id);

        Self {
            kind,
            enabled: config.enabled,
            keys: Cache::builder()
                .max_capacity(config.max_capacity)
                .eviction_listener(move |key: Arc<String>, id: String, cause: RemovalCause| {
                    if cause.was_evicted() {
                        unindex(&index, &id, &key);
                    }
                })
                .build(),
            keys_by_id,
            groups: Cache::builder().max_capacity(config.max_capacity).build(),
        }
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    /// Returns whether caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl ResourceCache for MemoryResourceCache {
    async fn id(&self, key: &str) -> CacheResult<Option<String>> {
        let result = if self.enabled {
            self.keys.get(key).await
        } else {
            None
        };
        record_lookup(self.kind, &result);
        Ok(result)
    }

    async fn save(&self, key: &str, id: &str) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.keys_by_id
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string());
        self.keys.insert(key.to_string(), id.to_string()).await;

        // A remove(id) that took the index between the two writes cleared a
        // key that was not cached yet; drop the entry it missed.
        if !indexed(&self.keys_by_id, id, key) {
            self.keys.invalidate(key).await;
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> CacheResult<()> {
        // Take the index entry atomically so a concurrent save for the same
        // ID lands in a fresh set instead of being dropped with this one.
        if let Some((_, keys)) = self.keys_by_id.remove(id) {
            for key in &keys {
                self.keys.invalidate(key).await;
            }
        }
        Ok(())
    }

    async fn view_group(&self, id: &str) -> CacheResult<Option<String>> {
        let result = if self.enabled {
            self.groups.get(id).await
        } else {
            None
        };
        record_lookup(self.kind, &result);
        Ok(result)
    }

    async fn save_group(&self, id: &str, group_id: &str) -> CacheResult<()> {
        if self.enabled {
            self.groups.insert(id.to_string(), group_id.to_string()).await;
        }
        Ok(())
    }

    async fn remove_group(&self, id: &str) -> CacheResult<()> {
        self.groups.invalidate(id).await;
        Ok(())
    }
}

/// In-memory [`GroupCache`].
pub struct MemoryGroupCache {
    enabled: bool,
    /// member ID -> group IDs
    members: Cache<String, Vec<String>>,
    /// Secondary index: group ID -> members whose cached set contains it.
    by_group: Arc<DashMap<String, HashSet<String>>>,
}

impl std::fmt::Debug for MemoryGroupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGroupCache")
            .field("enabled", &self.enabled)
            .field("member_count", &self.members.entry_count())
            .field("group_index_size", &self.by_group.len())
            .finish()
    }
}

impl MemoryGroupCache {
    pub fn new(config: &CacheConfig) -> Self {
        let by_group: Arc<DashMap<String, HashSet<String>>> = Arc::new(DashMap::new());
        let index = Arc::clone(&by_group);

        Self {
            enabled: config.enabled,
            members: Cache::builder()
                .max_capacity(config.max_capacity)
                .eviction_listener(
                    move |member_id: Arc<String>, group_ids: Vec<String>, cause: RemovalCause| {
                        if cause.was_evicted() {
                            for group_id in &group_ids {
                                unindex(&index, group_id, &member_id);
                            }
                        }
                    },
                )
                .build(),
            by_group,
        }
    }

    /// Drops a member's cached set and its entries in the group index.
    async fn forget_member(&self, member_id: &str) {
        if let Some(group_ids) = self.members.remove(member_id).await {
            for group_id in &group_ids {
                unindex(&self.by_group, group_id, member_id);
            }
        }
    }
}

#[async_trait]
impl GroupCache for MemoryGroupCache {
    async fn retrieve_group_ids_by_member(
        &self,
        member_id: &str,
    ) -> CacheResult<Option<Vec<String>>> {
        let result = if self.enabled {
            self.members.get(member_id).await
        } else {
            None
        };
        record_lookup(CacheKind::Group, &result);
        Ok(result)
    }

    async fn save_group_ids_by_member(
        &self,
        member_id: &str,
        group_ids: &[String],
    ) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        for group_id in group_ids {
            self.by_group
                .entry(group_id.clone())
                .or_default()
                .insert(member_id.to_string());
        }
        self.members
            .insert(member_id.to_string(), group_ids.to_vec())
            .await;

        if !group_ids
            .iter()
            .all(|group_id| indexed(&self.by_group, group_id, member_id))
        {
            self.members.invalidate(member_id).await;
        }
        Ok(())
    }

    async fn remove_group_ids_by_member(&self, member_id: &str) -> CacheResult<()> {
        self.forget_member(member_id).await;
        Ok(())
    }

    async fn remove_group(&self, group_id: &str) -> CacheResult<()> {
        if let Some((_, members)) = self.by_group.remove(group_id) {
            for member_id in &members {
                self.forget_member(member_id).await;
            }
        }
        Ok(())
    }
}
