use tracing::debug;

use warden_core::UserId;

use super::contracts::{CurrentUserProfile, UserDetails};
use super::{IdentityError, IdentityService};
use crate::principal::AuthenticatedPrincipal;
use crate::user::UserAccount;

impl IdentityService {
    /// Every account with its roles and live-resolved permissions.
    pub async fn list_users(&self) -> Result<Vec<UserDetails>, IdentityError> {
        let users = self.users.list_users().await?;
        let mut details = Vec::with_capacity(users.len());
        for user in users {
            details.push(self.details(user).await?);
        }
        debug!(count = details.len(), "listed users");
        Ok(details)
    }

    pub async fn user_by_id(&self, id: UserId) -> Result<UserDetails, IdentityError> {
        let user = self
            .users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        self.details(user).await
    }

    /// Profile of the caller. Permissions come from the presented token.
    pub async fn current_user(
        &self,
        principal: &AuthenticatedPrincipal,
    ) -> Result<CurrentUserProfile, IdentityError> {
        let user = self
            .users
            .find_user_by_id(principal.user_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(principal.user_id.to_string()))?;
        let roles = self.users.user_roles(user.id).await?;

        Ok(CurrentUserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            email_confirmed: user.email_confirmed,
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            permissions: principal.permissions.iter().cloned().collect(),
        })
    }

    async fn details(&self, user: UserAccount) -> Result<UserDetails, IdentityError> {
        let roles = self.users.user_roles(user.id).await?;
        let permissions = self.aggregator.resolve_permissions(&roles).await?;

        Ok(UserDetails {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            email_confirmed: user.email_confirmed,
            lockout_end: user.lockout_end,
            lockout_enabled: user.lockout_enabled,
            access_failed_count: user.access_failed_count,
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            permissions: permissions.iter().map(|p| p.as_str().to_string()).collect(),
        })
    }
}
