//! `warden-auth`: roles, permissions and JWT-based authorization.
//!
//! Role names expand into permission claims (`ClaimsAggregator`), which are
//! embedded into signed tokens (`TokenIssuer`). On the way back in, tokens
//! become a typed `AuthenticatedPrincipal` (`TokenValidator`), policy names
//! resolve to requirements (`PolicyProvider`) and `authorize` decides.
//!
//! No HTTP and no SQL here; storage sits behind the `store` ports.

pub mod aggregator;
pub mod authorize;
pub mod claims;
pub mod identity;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod store;
pub mod token;
pub mod user;

#[cfg(test)]
mod testing;

pub use aggregator::ClaimsAggregator;
pub use authorize::{AuthzError, Decision, authorize, evaluate, evaluate_permission};
pub use claims::{JwtClaims, RESERVED_CLAIM_NAMES, TokenValidationError, validate_claims};
pub use identity::{
    EmailError, EmailMessage, EmailSender, HashingError, IdentityError, IdentityOptions,
    IdentityService, PasswordHasher,
};
pub use permissions::{PERMISSION_CLAIM_TYPE, PERMISSION_POLICY_PREFIX, Permission};
pub use policy::{
    AuthorizationPolicy, DefaultPolicies, PermissionRequirement, PolicyError, PolicyLookup,
    PolicyProvider, Requirement, resolve_policy_name,
};
pub use principal::AuthenticatedPrincipal;
pub use roles::{Role, RoleClaim, RoleRecord};
pub use store::{RoleStore, StoreError, UserStore};
pub use token::{ConfigError, JwtSettings, TokenError, TokenIssuer, TokenValidator};
pub use user::{LockoutPolicy, PendingConfirmation, UserAccount};
