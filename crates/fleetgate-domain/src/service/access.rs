use async_trait::async_trait;

use crate::access::{ThingAccessRequest, UserAccessRequest};
use crate::error::DomainResult;

use super::{AccessService, FleetService};

#[async_trait]
impl AccessService for FleetService {
    async fn can_user_access_thing(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.access.can_user_access_thing(req).await
    }

    async fn can_user_access_profile(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.access.can_user_access_profile(req).await
    }

    async fn can_user_access_group(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.access.can_user_access_group(req).await
    }

    async fn can_user_access_org(&self, req: &UserAccessRequest) -> DomainResult<()> {
        self.access.can_user_access_org(req).await
    }

    async fn can_thing_access_group(&self, req: &ThingAccessRequest) -> DomainResult<()> {
        self.access.can_thing_access_group(req).await
    }
}
