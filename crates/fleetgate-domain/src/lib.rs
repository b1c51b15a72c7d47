//! fleetgate-domain: Access control and resource lifecycle for the device fleet
//!
//! This crate contains the core logic that sits between the transport layer
//! and the repositories:
//! - Lookaside caches for key, group and membership resolution
//! - The access evaluator that resolves owning groups and delegates the
//!   allow/deny decision to the external authorization service
//! - The service implementation covering thing, profile, group and
//!   membership lifecycle, plus tenant backup and restore
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fleetgate-domain              │
//! ├─────────────────────────────────────────────┤
//! │  clients/  - Auth, users and ID providers   │
//! │  cache/    - Lookaside caches               │
//! │  access/   - Access control evaluator       │
//! │  service/  - Lifecycle, listing, backup     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod cache;
pub mod clients;
pub mod error;
pub mod service;
pub mod stores;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types at the crate root
pub use access::{AccessConfig, AccessEvaluator, ThingAccessRequest, UserAccessRequest};
pub use cache::{CacheConfig, CacheError, CacheKind, CacheResult, Caches, GroupCache, ResourceCache};
pub use clients::{
    AuthClient, AuthorizeRequest, ClientError, ClientResult, IdProvider, Identity, Subject, User,
    UsersClient, UuidProvider,
};
pub use error::{DomainError, DomainResult};
pub use service::{
    AccessService, Backup, BackupService, FleetService, GroupMember, GroupService,
    MembershipService, ProfileService, PubConfInfo, Service, ThingService,
};
pub use stores::Repositories;
