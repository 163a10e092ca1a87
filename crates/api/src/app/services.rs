//! Service wiring: stores, hasher, mailer, token issuer/validator and policies.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use warden_auth::{
    ClaimsAggregator, DefaultPolicies, EmailSender, HashingError, IdentityService,
    PasswordHasher, PolicyProvider, RoleStore, StoreError, TokenIssuer, TokenValidator, UserStore,
};
use warden_infra::db::PgPool;
use warden_infra::{
    Argon2PasswordHasher, InMemoryIdentityStore, PostgresIdentityStore, default_role_grants,
    seed_roles,
};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("failed to seed roles and permissions: {0}")]
    Seed(#[from] StoreError),

    #[error(transparent)]
    Hasher(#[from] HashingError),
}

/// Everything request handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub identity: IdentityService,
    pub validator: TokenValidator,
    pub policies: Arc<PolicyProvider>,
}

impl AppServices {
    /// Wire services over the given stores and seed the well-known roles.
    pub async fn build(
        config: &ApiConfig,
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        email: Arc<dyn EmailSender>,
    ) -> Result<Self, ServicesError> {
        seed_roles(roles.as_ref(), &default_role_grants()).await?;

        let aggregator = ClaimsAggregator::new(roles);
        let tokens = TokenIssuer::new(config.jwt.clone(), aggregator.clone());
        let identity = IdentityService::new(
            users,
            hasher,
            email,
            tokens,
            aggregator,
            config.identity.clone(),
        );

        Ok(Self {
            identity,
            validator: TokenValidator::new(&config.jwt),
            policies: Arc::new(PolicyProvider::new(DefaultPolicies::default())),
        })
    }

    /// In-memory stores (tests/dev).
    pub async fn in_memory(
        config: &ApiConfig,
        email: Arc<dyn EmailSender>,
    ) -> Result<Self, ServicesError> {
        info!("using in-memory identity store");
        let store = Arc::new(InMemoryIdentityStore::new());
        let hasher = Argon2PasswordHasher::with_cost(config.password_cost)?;
        Self::build(config, store.clone(), store, Arc::new(hasher), email).await
    }

    /// Postgres-backed stores over an already migrated pool.
    pub async fn postgres(
        config: &ApiConfig,
        pool: PgPool,
        email: Arc<dyn EmailSender>,
    ) -> Result<Self, ServicesError> {
        info!("using postgres identity store");
        let store = Arc::new(PostgresIdentityStore::new(pool));
        let hasher = Argon2PasswordHasher::with_cost(config.password_cost)?;
        Self::build(config, store.clone(), store, Arc::new(hasher), email).await
    }
}
