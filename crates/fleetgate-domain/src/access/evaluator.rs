use std::sync::Arc;

use fleetgate_storage::Role;
use tracing::{debug, warn};

use crate::cache::{CacheKind, CacheResult, Caches};
use crate::clients::{AuthClient, AuthorizeRequest, ClientError, Identity, Subject};
use crate::error::{DomainError, DomainResult};
use crate::stores::Repositories;

use super::config::AccessConfig;
use super::types::{ThingAccessRequest, UserAccessRequest};
use super::bounded;

/// Evaluates user and device access to resources.
///
/// Stateless per call; all state lives in the shared repositories and
/// caches, so one instance serves every in-flight request.
pub struct AccessEvaluator {
    repos: Repositories,
    caches: Caches,
    auth: Arc<dyn AuthClient>,
    config: AccessConfig,
}

impl std::fmt::Debug for AccessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEvaluator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccessEvaluator {
    pub fn new(
        repos: Repositories,
        caches: Caches,
        auth: Arc<dyn AuthClient>,
        config: AccessConfig,
    ) -> Self {
        Self {
            repos,
            caches,
            auth,
            config,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Checks `req.action` on the group owning thing `req.id`.
    pub async fn can_user_access_thing(&self, req: &UserAccessRequest) -> DomainResult<()> {
        let group_id = self.group_id_by_thing(&req.id).await?;
        self.can_access_group(&req.token, &group_id, req.action)
            .await
    }

    /// Checks `req.action` on the group owning profile `req.id`.
    pub async fn can_user_access_profile(&self, req: &UserAccessRequest) -> DomainResult<()> {
        let group_id = self.group_id_by_profile(&req.id).await?;
        self.can_access_group(&req.token, &group_id, req.action)
            .await
    }

    pub async fn can_user_access_group(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.can_access_group(&req.token, &req.id, req.action).await
    }

    pub async fn can_user_access_org(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.can_access_org(&req.token, &req.id, req.action).await
    }

    /// Device-scoped check: the thing behind `req.key` must belong to group
    /// `req.id`. No external call is made.
    pub async fn can_thing_access_group(&self, req: &ThingAccessRequest) -> DomainResult<()> {
        let thing_id = self.identify(&req.key).await?;
        let group_id = self.group_id_by_thing(&thing_id).await?;

        if group_id != req.id {
            warn!(thing_id = %thing_id, group_id = %req.id, "thing denied access to foreign group");
            return Err(DomainError::authorization(format!(
                "thing {thing_id} does not belong to group {}",
                req.id
            )));
        }

        Ok(())
    }

    /// Resolves a thing key to the thing ID.
    pub async fn identify(&self, key: &str) -> DomainResult<String> {
        if let Some(id) = cached(CacheKind::Thing, self.caches.things.id(key).await) {
            return Ok(id);
        }

        let id = self.repos.things.retrieve_by_key(key).await?;
        self.caches.things.save(key, &id).await?;
        debug!(thing_id = %id, "resolved thing key from repository");
        Ok(id)
    }

    /// Resolves a user token to an identity.
    pub async fn identify_user(&self, token: &str) -> DomainResult<Identity> {
        bounded(self.config.rpc_timeout, self.auth.identify(token))
            .await?
            .map_err(|err| DomainError::Authentication {
                message: err.to_string(),
            })
    }

    /// Succeeds if the token belongs to a platform admin.
    pub async fn is_admin(&self, token: &str) -> DomainResult<()> {
        self.authorize(AuthorizeRequest::root(token)).await
    }

    /// Admin bypass, then `action` on the group.
    pub async fn can_access_group(&self, token: &str, group_id: &str, action: Role) -> DomainResult<()> {
        if self.is_admin(token).await.is_ok() {
            return Ok(());
        }

        self.authorize(AuthorizeRequest::scoped(token, group_id, Subject::Group, action))
            .await
            .map_err(|err| {
                warn!(group_id, action = %action, error = %err, "group access denied");
                err
            })
    }

    /// Admin bypass, then `action` on the org.
    pub async fn can_access_org(&self, token: &str, org_id: &str, action: Role) -> DomainResult<()> {
        if self.is_admin(token).await.is_ok() {
            return Ok(());
        }

        self.authorize(AuthorizeRequest::scoped(token, org_id, Subject::Org, action))
            .await
            .map_err(|err| {
                warn!(org_id, action = %action, error = %err, "org access denied");
                err
            })
    }

    pub async fn group_id_by_thing(&self, thing_id: &str) -> DomainResult<String> {
        if let Some(group_id) = cached(CacheKind::Thing, self.caches.things.view_group(thing_id).await) {
            return Ok(group_id);
        }

        let thing = self.repos.things.retrieve_by_id(thing_id).await?;
        self.caches
            .things
            .save_group(thing_id, &thing.group_id)
            .await?;
        debug!(thing_id, group_id = %thing.group_id, "resolved thing group from repository");
        Ok(thing.group_id)
    }

    pub async fn group_id_by_profile(&self, profile_id: &str) -> DomainResult<String> {
        if let Some(group_id) =
            cached(CacheKind::Profile, self.caches.profiles.view_group(profile_id).await)
        {
            return Ok(group_id);
        }

        let profile = self.repos.profiles.retrieve_by_id(profile_id).await?;
        self.caches
            .profiles
            .save_group(profile_id, &profile.group_id)
            .await?;
        debug!(profile_id, group_id = %profile.group_id, "resolved profile group from repository");
        Ok(profile.group_id)
    }

    /// Groups the member belongs to directly.
    pub async fn group_ids_by_member(&self, member_id: &str) -> DomainResult<Vec<String>> {
        if let Some(group_ids) = cached(
            CacheKind::Group,
            self.caches.groups.retrieve_group_ids_by_member(member_id).await,
        ) {
            return Ok(group_ids);
        }

        let group_ids = self
            .repos
            .memberships
            .retrieve_group_ids_by_member(member_id)
            .await?;
        self.caches
            .groups
            .save_group_ids_by_member(member_id, &group_ids)
            .await?;
        Ok(group_ids)
    }

    async fn authorize(&self, req: AuthorizeRequest) -> DomainResult<()> {
        match bounded(self.config.rpc_timeout, self.auth.authorize(req)).await? {
            Ok(()) => Ok(()),
            Err(ClientError::Unauthenticated(message)) => {
                Err(DomainError::Authentication { message })
            }
            Err(err) => Err(DomainError::authorization(err.to_string())),
        }
    }
}

fn cached<T>(kind: CacheKind, lookup: CacheResult<Option<T>>) -> Option<T> {
    match lookup {
        Ok(hit) => hit,
        Err(err) => {
            warn!(cache = %kind, error = %err, "cache lookup failed, using repository");
            None
        }
    }
}
