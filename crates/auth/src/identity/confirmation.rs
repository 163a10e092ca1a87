use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use warden_core::UserId;

use super::contracts::ConfirmEmailRequest;
use super::{IdentityError, IdentityService, validation};
use crate::user::{PendingConfirmation, UserAccount};

/// 32 random bytes, hex-encoded. Only its hash is persisted.
pub(super) fn generate_code() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(super) fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

pub(super) fn confirmation_link(base: &str, user_id: UserId, code: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}userId={user_id}&code={code}")
}

fn code_matches(user: &UserAccount, code: &str, now: DateTime<Utc>) -> bool {
    match &user.pending_confirmation {
        Some(PendingConfirmation {
            code_hash,
            expires_at,
        }) => now < *expires_at && *code_hash == hash_code(code),
        None => false,
    }
}

impl IdentityService {
    pub async fn confirm_email(&self, req: ConfirmEmailRequest) -> Result<(), IdentityError> {
        self.confirm_email_at(req, Utc::now()).await
    }

    pub async fn confirm_email_at(
        &self,
        req: ConfirmEmailRequest,
        now: DateTime<Utc>,
    ) -> Result<(), IdentityError> {
        let errors = validation::confirm_email(&req);
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        let user_id: UserId = req.user_id.parse().map_err(|_| {
            warn!(user_id = %req.user_id, "email confirmation with malformed user id");
            IdentityError::InvalidUserId
        })?;

        let Some(mut user) = self.users.find_user_by_id(user_id).await? else {
            warn!(%user_id, "email confirmation for unknown user");
            return Err(IdentityError::UnableToConfirm);
        };

        if !code_matches(&user, &req.code, now) {
            warn!(%user_id, "email confirmation rejected: invalid or expired code");
            return Err(IdentityError::InvalidConfirmationCode);
        }

        user.email_confirmed = true;
        user.pending_confirmation = None;
        self.users.update_user(&user).await?;

        info!(%user_id, "email confirmed");
        Ok(())
    }
}
