//! In-crate fakes for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::{RoleId, UserId};

use crate::aggregator::ClaimsAggregator;
use crate::identity::{
    EmailError, EmailMessage, EmailSender, HashingError, IdentityOptions, IdentityService,
    PasswordHasher, RegisterRequest,
};
use crate::permissions::Permission;
use crate::roles::{Role, RoleClaim, RoleRecord};
use crate::store::{RoleStore, StoreError, UserStore};
use crate::token::{JwtSettings, TokenIssuer};
use crate::user::{LockoutPolicy, UserAccount, normalize_email};

#[derive(Default)]
pub struct MemoryRoles {
    roles: Mutex<Vec<RoleRecord>>,
    claims: Mutex<HashMap<RoleId, Vec<RoleClaim>>>,
    failing: AtomicBool,
}

impl MemoryRoles {
    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryRoles {
    async fn find_role_by_name(&self, name: &Role) -> Result<Option<RoleRecord>, StoreError> {
        self.check()?;
        Ok(self.roles.lock().unwrap().iter().find(|r| &r.name == name).cloned())
    }

    async fn create_role(&self, name: &Role) -> Result<RoleRecord, StoreError> {
        let mut roles = self.roles.lock().unwrap();
        if roles.iter().any(|r| &r.name == name) {
            return Err(StoreError::Conflict(name.to_string()));
        }
        let record = RoleRecord::new(name.clone());
        roles.push(record.clone());
        Ok(record)
    }

    async fn role_claims(&self, role_id: RoleId) -> Result<Vec<RoleClaim>, StoreError> {
        self.check()?;
        Ok(self.claims.lock().unwrap().get(&role_id).cloned().unwrap_or_default())
    }

    async fn add_role_claim(&self, role_id: RoleId, claim: RoleClaim) -> Result<(), StoreError> {
        let mut claims = self.claims.lock().unwrap();
        let entry = claims.entry(role_id).or_default();
        if !entry.contains(&claim) {
            entry.push(claim);
        }
        Ok(())
    }

    async fn remove_role_claim(
        &self,
        role_id: RoleId,
        claim: &RoleClaim,
    ) -> Result<bool, StoreError> {
        let mut claims = self.claims.lock().unwrap();
        let entry = claims.entry(role_id).or_default();
        let before = entry.len();
        entry.retain(|c| c != claim);
        Ok(entry.len() != before)
    }
}

/// Admin holds the whole catalog; User holds ViewUsers, ViewFeatureX, ViewReportB.
pub async fn seeded_roles() -> Arc<MemoryRoles> {
    let store = MemoryRoles::default();
    let admin = store.create_role(&Role::ADMIN).await.unwrap();
    for p in Permission::ALL {
        store.add_role_claim(admin.id, RoleClaim::permission(p)).await.unwrap();
    }
    let user = store.create_role(&Role::USER).await.unwrap();
    for p in [Permission::ViewUsers, Permission::ViewFeatureX, Permission::ViewReportB] {
        store.add_role_claim(user.id, RoleClaim::permission(p)).await.unwrap();
    }
    Arc::new(store)
}

pub struct MemoryUsers {
    roles: Arc<MemoryRoles>,
    users: Mutex<Vec<UserAccount>>,
    memberships: Mutex<HashMap<UserId, Vec<Role>>>,
}

impl MemoryUsers {
    pub fn new(roles: Arc<MemoryRoles>) -> Self {
        Self {
            roles,
            users: Mutex::new(Vec::new()),
            memberships: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let key = normalize_email(email);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.normalized_email() == key)
            .cloned())
    }

    async fn create_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.normalized_email() == user.normalized_email()) {
            return Err(StoreError::Conflict(user.email.clone()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound(user.id.to_string()))?;
        *slot = user.clone();
        Ok(())
    }

    async fn record_access_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(user.record_failed_sign_in(policy, now))
    }

    async fn reset_access_failures(&self, id: UserId) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        user.record_successful_sign_in();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError> {
        Ok(self.memberships.lock().unwrap().get(&id).cloned().unwrap_or_default())
    }

    async fn add_user_to_role(&self, id: UserId, role: &Role) -> Result<(), StoreError> {
        if self.roles.find_role_by_name(role).await?.is_none() {
            return Err(StoreError::NotFound(role.to_string()));
        }
        let mut memberships = self.memberships.lock().unwrap();
        let roles = memberships.entry(id).or_default();
        if !roles.contains(role) {
            roles.push(role.clone());
        }
        Ok(())
    }
}

/// Reversible "hash" so tests stay fast.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash_password(&self, password: &str) -> Result<String, HashingError> {
        Ok(format!("plain:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, HashingError> {
        Ok(hash == format!("plain:{password}"))
    }
}

#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailSender for Outbox {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub const TEST_SIGNING_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Identity service over in-memory fakes plus its outbox.
pub async fn identity_fixture(options: IdentityOptions) -> (IdentityService, Arc<Outbox>) {
    let roles = seeded_roles().await;
    let users = Arc::new(MemoryUsers::new(roles.clone()));
    let outbox = Arc::new(Outbox::default());

    let aggregator = ClaimsAggregator::new(roles);
    let settings = JwtSettings::new("warden", "warden-clients", TEST_SIGNING_KEY, 60).unwrap();
    let tokens = TokenIssuer::new(settings, aggregator.clone());

    let service = IdentityService::new(
        users,
        Arc::new(PlainHasher),
        outbox.clone(),
        tokens,
        aggregator,
        options,
    );
    (service, outbox)
}

pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: email.into(),
        password: "Analytical1".into(),
    }
}

/// Confirmation code from the most recent mail.
pub fn sent_code(outbox: &Outbox) -> String {
    let sent = outbox.sent.lock().unwrap();
    let body = &sent.last().unwrap().text_body;
    body.rsplit("code=").next().unwrap().trim().to_string()
}
