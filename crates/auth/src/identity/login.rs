use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::contracts::{LoginRequest, LoginResponse};
use super::{IdentityError, IdentityService, validation};

impl IdentityService {
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, IdentityError> {
        self.login_at(req, Utc::now()).await
    }

    /// Check credentials as of `now` and issue a token on success.
    ///
    /// Every wrong password counts toward lockout, through the store so
    /// parallel attempts are all counted; the attempt that reaches the limit
    /// is itself reported as a lockout.
    pub async fn login_at(
        &self,
        req: LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<LoginResponse, IdentityError> {
        let errors = validation::login(&req);
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        info!("login attempt");

        let Some(user) = self.users.find_user_by_email(&req.email).await? else {
            warn!("login failed: unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        if self.options.require_confirmed_email && !user.email_confirmed {
            warn!(user_id = %user.id, "login failed: email not confirmed");
            return Err(IdentityError::EmailNotConfirmed);
        }

        if user.is_locked_out(now) {
            warn!(user_id = %user.id, "login failed: account locked out");
            return Err(IdentityError::LockedOut);
        }

        if !self.hasher.verify_password(&req.password, &user.password_hash)? {
            let locked = self
                .users
                .record_access_failure(user.id, &self.options.lockout, now)
                .await?;
            if locked {
                warn!(user_id = %user.id, "login failed: too many attempts, account locked out");
                return Err(IdentityError::LockedOut);
            }
            warn!(user_id = %user.id, "login failed: invalid password");
            return Err(IdentityError::InvalidCredentials);
        }

        if user.access_failed_count > 0 || user.lockout_end.is_some() {
            self.users.reset_access_failures(user.id).await?;
        }

        let roles = self.users.user_roles(user.id).await?;
        let token = self.tokens.issue(&user, &roles, BTreeMap::new()).await?;

        info!(user_id = %user.id, roles = roles.len(), "login succeeded");

        Ok(LoginResponse {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            token,
        })
    }
}
