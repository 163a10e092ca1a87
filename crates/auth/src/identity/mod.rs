//! Account lifecycle: registration, sign-in, email confirmation and the
//! user directory queries behind `/api/user`.
//!
//! Password hashing and email delivery are ports implemented in `warden-infra`.

mod confirmation;
mod contracts;
mod directory;
mod login;
mod registration;
mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::aggregator::ClaimsAggregator;
use crate::store::{StoreError, UserStore};
use crate::token::{TokenError, TokenIssuer};
use crate::user::LockoutPolicy;

pub use contracts::{
    ConfirmEmailRequest, CurrentUserProfile, LoginRequest, LoginResponse, RegisterRequest,
    UserDetails,
};
pub use validation::is_valid_email;

// ─────────────────────────────────────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct HashingError(pub String);

pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, HashingError>;

    /// `Ok(false)` for a wrong password; `Err` only for unusable hashes.
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, HashingError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("email delivery failed: {0}")]
pub struct EmailError(pub String);

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Options & errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IdentityOptions {
    pub require_confirmed_email: bool,
    pub lockout: LockoutPolicy,
    /// Base of the link mailed to new users; `userId` and `code` are appended.
    pub confirmation_url: String,
    pub confirmation_ttl: Duration,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            require_confirmed_email: true,
            lockout: LockoutPolicy::default(),
            confirmation_url: "http://localhost:3000/confirm-email".to_string(),
            confirmation_ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Email not confirmed.")]
    EmailNotConfirmed,

    #[error("Account locked out.")]
    LockedOut,

    #[error("Invalid user ID format.")]
    InvalidUserId,

    #[error("Unable to confirm email.")]
    UnableToConfirm,

    #[error("Invalid or expired confirmation code.")]
    InvalidConfirmationCode,

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Hashing(#[from] HashingError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrates the user store, password hasher, mailer and token issuer.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    email: Arc<dyn EmailSender>,
    tokens: TokenIssuer,
    aggregator: ClaimsAggregator,
    options: IdentityOptions,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        email: Arc<dyn EmailSender>,
        tokens: TokenIssuer,
        aggregator: ClaimsAggregator,
        options: IdentityOptions,
    ) -> Self {
        Self {
            users,
            hasher,
            email,
            tokens,
            aggregator,
            options,
        }
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }
}
