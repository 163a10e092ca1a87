//! Postgres-backed identity store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | Any other | `Backend` |
//! | Anything else | N/A | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{instrument, warn};

use warden_auth::user::normalize_email;
use warden_auth::{
    LockoutPolicy, PendingConfirmation, Role, RoleClaim, RoleRecord, RoleStore, StoreError, UserAccount,
    UserStore,
};
use warden_core::{RoleId, UserId};

/// Roles, role claims, users and memberships in Postgres.
///
/// Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
}

impl From<RoleRow> for RoleRecord {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::from_uuid(row.id),
            name: Role::new(row.name),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleClaimRow {
    claim_type: String,
    claim_value: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: String,
    email_confirmed: bool,
    access_failed_count: i32,
    lockout_enabled: bool,
    lockout_end: Option<DateTime<Utc>>,
    confirmation_code_hash: Option<String>,
    confirmation_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        let pending_confirmation = match (row.confirmation_code_hash, row.confirmation_expires_at) {
            (Some(code_hash), Some(expires_at)) => Some(PendingConfirmation {
                code_hash,
                expires_at,
            }),
            _ => None,
        };

        Self {
            id: UserId::from_uuid(row.id),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            email_confirmed: row.email_confirmed,
            access_failed_count: u32::try_from(row.access_failed_count).unwrap_or(0),
            lockout_enabled: row.lockout_enabled,
            lockout_end: row.lockout_end,
            pending_confirmation,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     email_confirmed, access_failed_count, lockout_enabled, lockout_end, \
     confirmation_code_hash, confirmation_expires_at, created_at";

fn failed_count(user: &UserAccount) -> i32 {
    i32::try_from(user.access_failed_count).unwrap_or(i32::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// RoleStore
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RoleStore for PostgresIdentityStore {
    #[instrument(skip(self), fields(role = %name), err)]
    async fn find_role_by_name(&self, name: &Role) -> Result<Option<RoleRecord>, StoreError> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), fields(role = %name), err)]
    async fn create_role(&self, name: &Role) -> Result<RoleRecord, StoreError> {
        let record = RoleRecord::new(name.clone());
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(record.id.as_uuid())
            .bind(record.name.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_role", e))?;
        Ok(record)
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn role_claims(&self, role_id: RoleId) -> Result<Vec<RoleClaim>, StoreError> {
        let rows = sqlx::query_as::<_, RoleClaimRow>(
            r#"
            SELECT claim_type, claim_value
            FROM role_claims
            WHERE role_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("role_claims", e))?;

        let mut claims = Vec::with_capacity(rows.len());
        for row in rows {
            match RoleClaim::new(row.claim_type, row.claim_value) {
                Ok(claim) => claims.push(claim),
                Err(e) => warn!(%role_id, error = %e, "ignoring invalid stored role claim"),
            }
        }
        Ok(claims)
    }

    #[instrument(skip(self, claim), fields(role_id = %role_id), err)]
    async fn add_role_claim(&self, role_id: RoleId, claim: RoleClaim) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO role_claims (role_id, claim_type, claim_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, claim_type, claim_value) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(claim.claim_type())
        .bind(claim.claim_value())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_role_claim", e))?;
        Ok(())
    }

    #[instrument(skip(self, claim), fields(role_id = %role_id), err)]
    async fn remove_role_claim(
        &self,
        role_id: RoleId,
        claim: &RoleClaim,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM role_claims WHERE role_id = $1 AND claim_type = $2 AND claim_value = $3",
        )
        .bind(role_id.as_uuid())
        .bind(claim.claim_type())
        .bind(claim.claim_value())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_role_claim", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UserStore
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PostgresIdentityStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip_all, err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE normalized_email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        Ok(row.map(Into::into))
    }

    #[instrument(skip_all, fields(user_id = %user.id), err)]
    async fn create_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let pending = user.pending_confirmation.as_ref();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, normalized_email, first_name, last_name,
                password_hash, email_confirmed, access_failed_count, lockout_enabled,
                lockout_end, confirmation_code_hash, confirmation_expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.normalized_email())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.email_confirmed)
        .bind(failed_count(user))
        .bind(user.lockout_enabled)
        .bind(user.lockout_end)
        .bind(pending.map(|p| p.code_hash.as_str()))
        .bind(pending.map(|p| p.expires_at))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let pending = user.pending_confirmation.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = $2,
                email = $3,
                normalized_email = $4,
                first_name = $5,
                last_name = $6,
                password_hash = $7,
                email_confirmed = $8,
                access_failed_count = $9,
                lockout_enabled = $10,
                lockout_end = $11,
                confirmation_code_hash = $12,
                confirmation_expires_at = $13
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.normalized_email())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.email_confirmed)
        .bind(failed_count(user))
        .bind(user.lockout_enabled)
        .bind(user.lockout_end)
        .bind(pending.map(|p| p.code_hash.as_str()))
        .bind(pending.map(|p| p.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    #[instrument(skip(self, policy), fields(user_id = %id), err)]
    async fn record_access_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let lockout_end = now
            .checked_add_signed(policy.lockout_duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let max_attempts = i32::try_from(policy.max_failed_attempts).unwrap_or(i32::MAX);

        // Single statement: the row lock serializes concurrent failures.
        let locked: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE users SET
                access_failed_count = CASE
                    WHEN access_failed_count + 1 >= $2 THEN 0
                    ELSE access_failed_count + 1
                END,
                lockout_end = CASE
                    WHEN access_failed_count + 1 >= $2 THEN $3
                    ELSE lockout_end
                END
            WHERE id = $1 AND lockout_enabled
            RETURNING access_failed_count = 0
            "#,
        )
        .bind(id.as_uuid())
        .bind(max_attempts)
        .bind(lockout_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_access_failure", e))?;

        match locked {
            Some(locked) => Ok(locked),
            None if self.find_user_by_id(id).await?.is_some() => Ok(false),
            None => Err(StoreError::NotFound(format!("user {id}"))),
        }
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn reset_access_failures(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET access_failed_count = 0, lockout_end = NULL WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset_access_failures", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at ASC, r.name ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_roles", e))?;
        Ok(names.into_iter().map(Role::new).collect())
    }

    #[instrument(skip(self), fields(user_id = %id, role = %role), err)]
    async fn add_user_to_role(&self, id: UserId, role: &Role) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r WHERE r.name = $2
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(id.as_uuid())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_user_to_role", e))?;

        if result.rows_affected() == 0 && self.find_role_by_name(role).await?.is_none() {
            return Err(StoreError::NotFound(format!("role '{role}'")));
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
