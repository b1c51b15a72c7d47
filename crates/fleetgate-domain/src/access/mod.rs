//! Access control evaluator.
//!
//! Resolves the group that owns a thing or profile (cache first, repository
//! on miss) and delegates the allow/deny decision to the external
//! authorization service.
//!
//! # Architecture Decisions
//!
//! - **Ordering**: group resolution happens before the authorization call,
//!   which happens before any repository mutation performed by the caller.
//!   A resource that cannot be resolved fails with NotFound even for admins.
//!
//! - **Admin bypass**: the root check is attempted before every scoped
//!   group/org check. Admins therefore pass for groups and orgs that do not
//!   exist yet.
//!
//! - **Deadlines**: every auth/users call is bounded by
//!   [`AccessConfig::rpc_timeout`]. Dropping the caller's future abandons
//!   the call as well.
//!
//! - **Cache failures**: a failed cache read is logged and treated as a
//!   miss; a failed cache write is returned to the caller.

mod config;
mod evaluator;
mod types;


use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{DomainError, DomainResult};

pub use config::AccessConfig;
pub use evaluator::AccessEvaluator;
pub use types::{ThingAccessRequest, UserAccessRequest};

/// Runs `fut` with a deadline, mapping expiry to [`DomainError::Timeout`].
pub(crate) async fn bounded<F: Future>(limit: Duration, fut: F) -> DomainResult<F::Output> {
    timeout(limit, fut).await.map_err(|_| DomainError::Timeout {
        duration_ms: limit.as_millis() as u64,
    })
}
