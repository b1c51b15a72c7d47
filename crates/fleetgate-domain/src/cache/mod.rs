//! Lookaside caches for key, group and membership resolution.
//!
//! Caches are pure accelerators over the repositories: every lookup path in
//! the domain layer falls back to a repository read on a miss, so
//! correctness holds with caching disabled entirely.
//!
//! # Contract
//!
//! - A miss is `Ok(None)`, never an error.
//! - Write failures are errors and must be propagated by callers.
//! - Entries never expire. Staleness is corrected only by explicit removal
//!   when the owning entity is deleted or its membership changes.
//!
//! # Caches
//!
//! | Cache | Maps |
//! |---|---|
//! | thing ([`ResourceCache`]) | thing key -> thing ID, thing ID -> group ID |
//! | profile ([`ResourceCache`]) | profile ID -> group ID |
//! | group ([`GroupCache`]) | member ID -> group IDs |
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetgate_domain::cache::{CacheConfig, CacheKind, MemoryResourceCache, ResourceCache};
//!
//! let cache = MemoryResourceCache::new(CacheKind::Thing, &CacheConfig::default());
//! cache.save("device-key", "thing-1").await?;
//!
//! assert_eq!(cache.id("device-key").await?, Some("thing-1".to_string()));
//! ```

mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryGroupCache, MemoryResourceCache};

/// Errors from cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {message}")]
    Unavailable { message: String },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Which entity kind a cache serves. Used as the metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Thing,
    Profile,
    Group,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Thing => "thing",
            CacheKind::Profile => "profile",
            CacheKind::Group => "group",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration shared by the in-memory caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup misses and writes are dropped.
    pub enabled: bool,
    /// Maximum number of entries per map.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 100_000,
        }
    }
}

impl CacheConfig {
    /// Enables or disables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Cache for a resource kind that is owned by a group.
///
/// The thing cache uses both maps; the profile cache only the group map.
#[async_trait]
pub trait ResourceCache: Send + Sync + 'static {
    /// Resolves a key to the resource ID.
    async fn id(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores a key -> ID mapping.
    async fn save(&self, key: &str, id: &str) -> CacheResult<()>;

    /// Drops every key mapping pointing at `id`.
    async fn remove(&self, id: &str) -> CacheResult<()>;

    /// Resolves a resource ID to its owning group.
    async fn view_group(&self, id: &str) -> CacheResult<Option<String>>;

    /// Stores a resource ID -> group ID mapping.
    async fn save_group(&self, id: &str, group_id: &str) -> CacheResult<()>;

    /// Drops the group mapping of `id`.
    async fn remove_group(&self, id: &str) -> CacheResult<()>;
}

/// Cache of member -> group ID sets.
#[async_trait]
pub trait GroupCache: Send + Sync + 'static {
    async fn retrieve_group_ids_by_member(&self, member_id: &str)
        -> CacheResult<Option<Vec<String>>>;

    async fn save_group_ids_by_member(&self, member_id: &str, group_ids: &[String])
        -> CacheResult<()>;

    /// Invalidates one member's entry.
    async fn remove_group_ids_by_member(&self, member_id: &str) -> CacheResult<()>;

    /// Invalidates every member entry that contains `group_id`.
    async fn remove_group(&self, group_id: &str) -> CacheResult<()>;
}

/// The three process-wide caches, shared by the evaluator and the service.
#[derive(Clone)]
pub struct Caches {
    pub things: Arc<dyn ResourceCache>,
    pub profiles: Arc<dyn ResourceCache>,
    pub groups: Arc<dyn GroupCache>,
}

impl Caches {
    /// Builds the moka-backed in-memory caches.
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self {
            things: Arc::new(MemoryResourceCache::new(CacheKind::Thing, config)),
            profiles: Arc::new(MemoryResourceCache::new(CacheKind::Profile, config)),
            groups: Arc::new(MemoryGroupCache::new(config)),
        }
    }
}

impl fmt::Debug for Caches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caches").finish_non_exhaustive()
    }
}

pub(crate) fn record_lookup<T>(kind: CacheKind, result: &Option<T>) {
    if result.is_some() {
        metrics::counter!("fleetgate_cache_hits_total", "cache" => kind.as_str()).increment(1);
    } else {
        metrics::counter!("fleetgate_cache_misses_total", "cache" => kind.as_str()).increment(1);
    }
}

/// Registers cache metrics descriptions.
///
/// # Metrics Registered
///
/// - `fleetgate_cache_hits_total` - Lookups answered from a cache, by `cache`
/// - `fleetgate_cache_misses_total` - Lookups that fell back to a repository, by `cache`
pub fn register_cache_metrics() {
    metrics::describe_counter!(
        "fleetgate_cache_hits_total",
        "Total number of lookaside cache hits"
    );
    metrics::describe_counter!(
        "fleetgate_cache_misses_total",
        "Total number of lookaside cache misses"
    );
}
