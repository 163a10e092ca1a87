//! Policy resolution.
//!
//! Policy names with the `permission:` prefix become a single
//! [`PermissionRequirement`]; every other name (and the default/fallback
//! lookups) is delegated to the registered [`DefaultPolicies`].

use std::collections::HashMap;

use thiserror::Error;

use crate::permissions::PERMISSION_POLICY_PREFIX;
use crate::roles::Role;

/// "The principal must carry a permission claim with exactly this value."
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionRequirement {
    permission: String,
}

impl PermissionRequirement {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

/// Outcome of looking a policy name up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLookup<'a> {
    RequiresPermission(PermissionRequirement),
    Delegate(&'a str),
}

/// Map a policy name to what it requires. Pure; no registry involved.
///
/// The prefix is matched ASCII case-insensitively, the remainder is kept as-is.
pub fn resolve_policy_name(name: &str) -> PolicyLookup<'_> {
    let prefix_len = PERMISSION_POLICY_PREFIX.len();
    match name.get(..prefix_len) {
        Some(head) if head.eq_ignore_ascii_case(PERMISSION_POLICY_PREFIX) => {
            PolicyLookup::RequiresPermission(PermissionRequirement::new(&name[prefix_len..]))
        }
        _ => PolicyLookup::Delegate(name),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated principal.
    AuthenticatedUser,
    /// At least one of these roles.
    RoleIn(Vec<Role>),
    Permission(PermissionRequirement),
}

/// A set of requirements; all must hold. Every policy implies authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    requirements: Vec<Requirement>,
}

impl AuthorizationPolicy {
    pub fn authenticated_user() -> Self {
        Self {
            requirements: vec![Requirement::AuthenticatedUser],
        }
    }

    pub fn require_role<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        Self {
            requirements: vec![Requirement::RoleIn(roles.into_iter().collect())],
        }
    }

    pub fn require_permission(requirement: PermissionRequirement) -> Self {
        Self {
            requirements: vec![Requirement::Permission(requirement)],
        }
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

/// Built-in policies: the default policy, an optional fallback, and named ones.
#[derive(Debug, Clone)]
pub struct DefaultPolicies {
    default: AuthorizationPolicy,
    fallback: Option<AuthorizationPolicy>,
    named: HashMap<String, AuthorizationPolicy>,
}

impl Default for DefaultPolicies {
    fn default() -> Self {
        Self {
            default: AuthorizationPolicy::authenticated_user(),
            fallback: None,
            named: HashMap::new(),
        }
    }
}

impl DefaultPolicies {
    pub fn with_policy(mut self, name: impl Into<String>, policy: AuthorizationPolicy) -> Self {
        self.named.insert(name.into(), policy);
        self
    }

    pub fn with_fallback(mut self, policy: AuthorizationPolicy) -> Self {
        self.fallback = Some(policy);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AuthorizationPolicy> {
        self.named.get(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no authorization policy named '{0}'")]
    UnknownPolicy(String),
}

/// Single dispatcher over permission policies and the built-in ones.
#[derive(Debug, Clone, Default)]
pub struct PolicyProvider {
    defaults: DefaultPolicies,
}

impl PolicyProvider {
    pub fn new(defaults: DefaultPolicies) -> Self {
        Self { defaults }
    }

    pub fn get_policy(&self, name: &str) -> Option<AuthorizationPolicy> {
        match resolve_policy_name(name) {
            PolicyLookup::RequiresPermission(req) => {
                Some(AuthorizationPolicy::require_permission(req))
            }
            PolicyLookup::Delegate(name) => self.defaults.get(name).cloned(),
        }
    }

    pub fn require_policy(&self, name: &str) -> Result<AuthorizationPolicy, PolicyError> {
        self.get_policy(name)
            .ok_or_else(|| PolicyError::UnknownPolicy(name.to_string()))
    }

    pub fn default_policy(&self) -> &AuthorizationPolicy {
        &self.defaults.default
    }

    pub fn fallback_policy(&self) -> Option<&AuthorizationPolicy> {
        self.defaults.fallback.as_ref()
    }
}
