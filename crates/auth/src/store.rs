//! Storage ports for roles, role claims and user accounts.
//!
//! Implementations live in `warden-infra`. All lookups are plain async
//! reads; dropping the returned future abandons the lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use warden_core::{RoleId, UserId};

use crate::roles::{Role, RoleClaim, RoleRecord};
use crate::user::{LockoutPolicy, UserAccount};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Role and role-claim persistence.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Look up a role by exact name. A miss is `Ok(None)`, never an error.
    async fn find_role_by_name(&self, name: &Role) -> Result<Option<RoleRecord>, StoreError>;

    /// Create a role; `Conflict` when the name is already taken.
    async fn create_role(&self, name: &Role) -> Result<RoleRecord, StoreError>;

    /// All claims attached to a role (any claim type).
    async fn role_claims(&self, role_id: RoleId) -> Result<Vec<RoleClaim>, StoreError>;

    /// Attach a claim. Adding an identical claim twice is a no-op.
    async fn add_role_claim(&self, role_id: RoleId, claim: RoleClaim) -> Result<(), StoreError>;

    /// Detach a claim. Returns whether anything was removed.
    async fn remove_role_claim(&self, role_id: RoleId, claim: &RoleClaim)
    -> Result<bool, StoreError>;
}

/// User account persistence and user↔role membership.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Case-insensitive lookup by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Insert a new account; `Conflict` when the email is already registered.
    async fn create_user(&self, user: &UserAccount) -> Result<(), StoreError>;

    /// Overwrite a previously created account.
    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError>;

    /// Count one failed password check as a single atomic step, locking the
    /// account once `policy.max_failed_attempts` is reached. Returns whether
    /// this failure locked it.
    async fn record_access_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Clear the failure counter and any lockout.
    async fn reset_access_failures(&self, id: UserId) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError>;

    /// Role names held by a user, in assignment order.
    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError>;

    /// Assign a role; `NotFound` when either the user or the role is missing.
    async fn add_user_to_role(&self, id: UserId, role: &Role) -> Result<(), StoreError>;
}
