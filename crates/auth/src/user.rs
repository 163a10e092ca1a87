//! User account record.
//!
//! Holds identity data plus the sign-in state (failed attempts, lockout,
//! pending email confirmation) the identity service mutates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use warden_core::UserId;

// ─────────────────────────────────────────────────────────────────────────────
// Lockout
// ─────────────────────────────────────────────────────────────────────────────

/// Account lockout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
    pub enabled_for_new_users: bool,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(5),
            enabled_for_new_users: true,
        }
    }
}

/// An outstanding email-confirmation code (only its hash is kept).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// User Account
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_confirmed: bool,
    pub access_failed_count: u32,
    pub lockout_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub pending_confirmation: Option<PendingConfirmation>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// A freshly registered, unconfirmed account. The username is the email.
    pub fn new(
        email: impl Into<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        password_hash: String,
        lockout: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.into().trim().to_string();
        Self {
            id: UserId::new(),
            username: email.clone(),
            email,
            first_name,
            last_name,
            password_hash,
            email_confirmed: false,
            access_failed_count: 0,
            lockout_enabled: lockout.enabled_for_new_users,
            lockout_end: None,
            pending_confirmation: None,
            created_at: now,
        }
    }

    /// Case-insensitive lookup key for the email address.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }

    /// Record a failed password check. Returns `true` when this failure locked
    /// the account.
    pub fn record_failed_sign_in(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        if !self.lockout_enabled {
            return false;
        }

        self.access_failed_count += 1;
        if self.access_failed_count >= policy.max_failed_attempts {
            self.lockout_end = Some(
                now.checked_add_signed(policy.lockout_duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            );
            self.access_failed_count = 0;
            return true;
        }
        false
    }

    pub fn record_successful_sign_in(&mut self) {
        self.access_failed_count = 0;
        self.lockout_end = None;
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
