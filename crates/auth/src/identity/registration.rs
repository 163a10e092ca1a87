use chrono::Utc;
use tracing::{error, info, warn};

use warden_core::UserId;

use super::confirmation::{confirmation_link, generate_code, hash_code};
use super::contracts::RegisterRequest;
use super::{EmailMessage, IdentityError, IdentityService, validation};
use crate::roles::Role;
use crate::store::StoreError;
use crate::user::{PendingConfirmation, UserAccount};

fn optional(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl IdentityService {
    /// Create an account holding the default `User` role.
    ///
    /// Role assignment and confirmation mail failures are logged; the account
    /// still exists afterwards.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserId, IdentityError> {
        let errors = validation::register(&req);
        if !errors.is_empty() {
            warn!(error_count = errors.len(), "registration rejected by validation");
            return Err(IdentityError::Validation(errors));
        }

        let email = req.email.trim();
        if self.users.find_user_by_email(email).await?.is_some() {
            warn!("registration rejected: email already taken");
            return Err(IdentityError::Conflict(format!(
                "Email '{email}' is already taken."
            )));
        }

        let password_hash = self.hasher.hash_password(&req.password)?;
        let now = Utc::now();
        let mut user = UserAccount::new(
            email,
            optional(&req.first_name),
            optional(&req.last_name),
            password_hash,
            &self.options.lockout,
            now,
        );

        let code = if self.options.require_confirmed_email {
            let code = generate_code();
            user.pending_confirmation = Some(PendingConfirmation {
                code_hash: hash_code(&code),
                expires_at: now + self.options.confirmation_ttl,
            });
            Some(code)
        } else {
            None
        };

        self.users.create_user(&user).await.map_err(|e| match e {
            StoreError::Conflict(_) => {
                IdentityError::Conflict(format!("Email '{email}' is already taken."))
            }
            other => IdentityError::Store(other),
        })?;
        info!(user_id = %user.id, "user registered");

        match self.users.add_user_to_role(user.id, &Role::USER).await {
            Ok(()) => info!(user_id = %user.id, role = %Role::USER, "assigned default role"),
            Err(e) => warn!(
                user_id = %user.id,
                role = %Role::USER,
                error = %e,
                "failed to assign default role"
            ),
        }

        if let Some(code) = code {
            self.send_confirmation(&user, &code).await;
        }

        Ok(user.id)
    }

    async fn send_confirmation(&self, user: &UserAccount, code: &str) {
        let link = confirmation_link(&self.options.confirmation_url, user.id, code);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Confirm your email".to_string(),
            text_body: format!("Please confirm your account by visiting: {link}"),
            html_body: Some(format!(
                "Please confirm your account by <a href='{}'>clicking here</a>.",
                link.replace('&', "&amp;")
            )),
        };

        match self.email.send(message).await {
            Ok(()) => info!(user_id = %user.id, "confirmation email dispatched"),
            Err(e) => error!(user_id = %user.id, error = %e, "failed to send confirmation email"),
        }
    }
}
