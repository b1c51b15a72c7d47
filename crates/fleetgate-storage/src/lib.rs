//! fleetgate-storage: Repository abstraction layer
//!
//! This crate provides the persistence contracts for fleetgate, including:
//! - Entity records exchanged with the service layer (things, profiles,
//!   groups and group memberships)
//! - Repository traits, one per entity kind
//! - An in-memory implementation of every repository trait
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             fleetgate-storage               │
//! ├─────────────────────────────────────────────┤
//! │  models.rs - Entity records & pagination    │
//! │  traits.rs - Repository trait definitions   │
//! │  memory.rs - In-memory implementation       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use models::{
    EntityKind, Group, GroupMembership, GroupMembershipsPage, GroupsPage, Metadata, Page,
    PageMetadata, Profile, ProfilesPage, Role, Thing, ThingsPage,
};
pub use traits::{GroupMembershipsRepository, GroupRepository, ProfileRepository, ThingRepository};
