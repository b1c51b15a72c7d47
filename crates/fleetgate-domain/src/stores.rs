//! Repository handles shared by the evaluator and the service.

use std::fmt;
use std::sync::Arc;

use fleetgate_storage::{
    GroupMembershipsRepository, GroupRepository, MemoryStore, ProfileRepository, ThingRepository,
};

/// The four entity repositories.
#[derive(Clone)]
pub struct Repositories {
    pub things: Arc<dyn ThingRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub memberships: Arc<dyn GroupMembershipsRepository>,
}

impl Repositories {
    /// Uses one in-memory store for all four repositories.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            things: store.clone(),
            profiles: store.clone(),
            groups: store.clone(),
            memberships: store,
        }
    }
}

impl fmt::Debug for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
