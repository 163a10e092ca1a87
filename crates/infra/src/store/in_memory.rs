use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_auth::user::normalize_email;
use warden_auth::{
    LockoutPolicy, Role, RoleClaim, RoleRecord, RoleStore, StoreError, UserAccount, UserStore,
};
use warden_core::{RoleId, UserId};

#[derive(Debug, Default)]
struct State {
    roles: Vec<RoleRecord>,
    role_claims: HashMap<RoleId, Vec<RoleClaim>>,
    users: Vec<UserAccount>,
    /// Role ids per user, in assignment order.
    memberships: HashMap<UserId, Vec<RoleId>>,
}

impl State {
    fn role_by_name(&self, name: &Role) -> Option<&RoleRecord> {
        self.roles.iter().find(|r| &r.name == name)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserAccount, StoreError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }
}

/// In-memory roles, claims, users and memberships.
///
/// Intended for tests/dev. Everything lives behind one lock so membership and
/// role lookups always agree.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    state: RwLock<State>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl RoleStore for InMemoryIdentityStore {
    async fn find_role_by_name(&self, name: &Role) -> Result<Option<RoleRecord>, StoreError> {
        Ok(self.read()?.role_by_name(name).cloned())
    }

    async fn create_role(&self, name: &Role) -> Result<RoleRecord, StoreError> {
        let mut state = self.write()?;
        if state.role_by_name(name).is_some() {
            return Err(StoreError::Conflict(format!("role '{name}' already exists")));
        }
        let record = RoleRecord::new(name.clone());
        state.roles.push(record.clone());
        Ok(record)
    }

    async fn role_claims(&self, role_id: RoleId) -> Result<Vec<RoleClaim>, StoreError> {
        Ok(self
            .read()?
            .role_claims
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_role_claim(&self, role_id: RoleId, claim: RoleClaim) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.roles.iter().any(|r| r.id == role_id) {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        let claims = state.role_claims.entry(role_id).or_default();
        if !claims.contains(&claim) {
            claims.push(claim);
        }
        Ok(())
    }

    async fn remove_role_claim(
        &self,
        role_id: RoleId,
        claim: &RoleClaim,
    ) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        let Some(claims) = state.role_claims.get_mut(&role_id) else {
            return Ok(false);
        };
        let before = claims.len();
        claims.retain(|c| c != claim);
        Ok(claims.len() != before)
    }
}

#[async_trait]
impl UserStore for InMemoryIdentityStore {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let key = normalize_email(email);
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.normalized_email() == key)
            .cloned())
    }

    async fn create_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let key = user.normalized_email();
        if state.users.iter().any(|u| u.normalized_email() == key) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        if state.users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        *self.write()?.user_mut(user.id)? = user.clone();
        Ok(())
    }

    async fn record_access_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.write()?.user_mut(id)?.record_failed_sign_in(policy, now))
    }

    async fn reset_access_failures(&self, id: UserId) -> Result<(), StoreError> {
        self.write()?.user_mut(id)?.record_successful_sign_in();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let mut users = self.read()?.users.clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError> {
        let state = self.read()?;
        let Some(role_ids) = state.memberships.get(&id) else {
            return Ok(Vec::new());
        };
        Ok(role_ids
            .iter()
            .filter_map(|rid| state.roles.iter().find(|r| r.id == *rid))
            .map(|r| r.name.clone())
            .collect())
    }

    async fn add_user_to_role(&self, id: UserId, role: &Role) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.users.iter().any(|u| u.id == id) {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        let role_id = state
            .role_by_name(role)
            .map(|r| r.id)
            .ok_or_else(|| StoreError::NotFound(format!("role '{role}'")))?;

        let held = state.memberships.entry(id).or_default();
        if !held.contains(&role_id) {
            held.push(role_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_auth::Permission;

    fn account(email: &str) -> UserAccount {
        UserAccount::new(
            email,
            None,
            None,
            "hash".to_string(),
            &LockoutPolicy::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn role_names_are_unique() {
        let store = InMemoryIdentityStore::new();
        store.create_role(&Role::ADMIN).await.unwrap();
        assert!(matches!(
            store.create_role(&Role::ADMIN).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.find_role_by_name(&Role::new("Ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_claims_are_idempotent_and_revocable() {
        let store = InMemoryIdentityStore::new();
        let admin = store.create_role(&Role::ADMIN).await.unwrap();
        let claim = RoleClaim::permission(Permission::EditUsers);

        store.add_role_claim(admin.id, claim.clone()).await.unwrap();
        store.add_role_claim(admin.id, claim.clone()).await.unwrap();
        assert_eq!(store.role_claims(admin.id).await.unwrap(), vec![claim.clone()]);

        assert!(store.remove_role_claim(admin.id, &claim).await.unwrap());
        assert!(!store.remove_role_claim(admin.id, &claim).await.unwrap());
        assert!(store.role_claims(admin.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claims_on_missing_roles_are_rejected() {
        let store = InMemoryIdentityStore::new();
        let err = store
            .add_role_claim(RoleId::new(), RoleClaim::permission(Permission::ViewUsers))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn email_lookup_and_uniqueness_ignore_case() {
        let store = InMemoryIdentityStore::new();
        let user = account("Ada@Example.com");
        store.create_user(&user).await.unwrap();

        let found = store.find_user_by_email("ada@example.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        assert!(matches!(
            store.create_user(&account("ADA@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn updates_overwrite_the_stored_account() {
        let store = InMemoryIdentityStore::new();
        let mut user = account("ada@example.com");
        store.create_user(&user).await.unwrap();

        user.email_confirmed = true;
        store.update_user(&user).await.unwrap();
        assert!(store.find_user_by_id(user.id).await.unwrap().unwrap().email_confirmed);

        let stranger = account("nobody@example.com");
        assert!(matches!(
            store.update_user(&stranger).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn memberships_keep_assignment_order_without_duplicates() {
        let store = InMemoryIdentityStore::new();
        store.create_role(&Role::ADMIN).await.unwrap();
        store.create_role(&Role::USER).await.unwrap();
        let user = account("ada@example.com");
        store.create_user(&user).await.unwrap();

        store.add_user_to_role(user.id, &Role::USER).await.unwrap();
        store.add_user_to_role(user.id, &Role::ADMIN).await.unwrap();
        store.add_user_to_role(user.id, &Role::USER).await.unwrap();

        assert_eq!(
            store.user_roles(user.id).await.unwrap(),
            vec![Role::USER, Role::ADMIN]
        );
        assert!(matches!(
            store.add_user_to_role(user.id, &Role::new("Ghost")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failures_are_all_counted() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let user = account("ada@example.com");
        store.create_user(&user).await.unwrap();

        let policy = LockoutPolicy {
            max_failed_attempts: 8,
            ..LockoutPolicy::default()
        };
        let now = Utc::now();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.record_access_failure(user.id, &policy, now).await.unwrap()
                })
            })
            .collect();

        let mut locked = 0;
        for task in tasks {
            if task.await.unwrap() {
                locked += 1;
            }
        }
        assert_eq!(locked, 1);

        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.is_locked_out(now));
        assert_eq!(stored.access_failed_count, 0);

        store.reset_access_failures(user.id).await.unwrap();
        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(!stored.is_locked_out(now));
    }

    #[tokio::test]
    async fn failure_counting_needs_a_known_user() {
        let store = InMemoryIdentityStore::new();
        let err = store
            .record_access_failure(UserId::new(), &LockoutPolicy::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
