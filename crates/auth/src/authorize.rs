use std::collections::BTreeSet;

use thiserror::Error;

use crate::policy::{AuthorizationPolicy, PermissionRequirement, Requirement};
use crate::principal::AuthenticatedPrincipal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: requires one of roles [{0}]")]
    MissingRole(String),
}

/// Decide a single permission requirement against a set of permission claim values.
///
/// - No IO
/// - No panics
/// - Deny is a value, not an error
pub fn evaluate<'a, I>(permission_claims: I, required: &PermissionRequirement) -> Decision
where
    I: IntoIterator<Item = &'a str>,
{
    let held: BTreeSet<&str> = permission_claims.into_iter().collect();
    if held.contains(required.permission()) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// [`evaluate`] over the principal's typed permission set.
pub fn evaluate_permission(
    principal: &AuthenticatedPrincipal,
    required: &PermissionRequirement,
) -> Decision {
    evaluate(principal.permissions.iter().map(String::as_str), required)
}

/// Check every requirement of `policy`. Absent principal is always unauthenticated.
pub fn authorize(
    principal: Option<&AuthenticatedPrincipal>,
    policy: &AuthorizationPolicy,
) -> Result<(), AuthzError> {
    let principal = principal.ok_or(AuthzError::Unauthenticated)?;

    for requirement in policy.requirements() {
        match requirement {
            Requirement::AuthenticatedUser => {}
            Requirement::RoleIn(roles) => {
                if !roles.iter().any(|r| principal.has_role(r)) {
                    let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                    return Err(AuthzError::MissingRole(names.join(", ")));
                }
            }
            Requirement::Permission(required) => {
                if !evaluate_permission(principal, required).is_allowed() {
                    return Err(AuthzError::Forbidden(required.permission().to_string()));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use warden_core::UserId;

    fn principal(permissions: &[&str], roles: &[Role]) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal {
            user_id: UserId::new(),
            username: "ada@example.com".into(),
            email: "ada@example.com".into(),
            given_name: "Ada".into(),
            family_name: "Lovelace".into(),
            roles: roles.to_vec(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            token_id: "jti".into(),
        }
    }

    #[test]
    fn allows_only_held_permissions() {
        let p = principal(&["ViewUsers", "ViewFeatureX"], &[]);

        assert_eq!(
            evaluate_permission(&p, &PermissionRequirement::new("ViewUsers")),
            Decision::Allow
        );
        assert_eq!(
            evaluate_permission(&p, &PermissionRequirement::new("EditUsers")),
            Decision::Deny
        );
    }

    #[test]
    fn match_is_exact() {
        let claims = ["ViewUsers"];
        let deny = |v: &str| evaluate(claims, &PermissionRequirement::new(v)) == Decision::Deny;
        assert!(deny("viewusers"));
        assert!(deny("permission:ViewUsers"));
        assert!(deny(""));
    }

    #[test]
    fn no_principal_is_unauthenticated_not_forbidden() {
        let policy = AuthorizationPolicy::require_permission(PermissionRequirement::new("ViewUsers"));
        assert_eq!(authorize(None, &policy), Err(AuthzError::Unauthenticated));
        assert_eq!(
            authorize(None, &AuthorizationPolicy::authenticated_user()),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(&["ViewUsers"], &[Role::USER]);
        let policy = AuthorizationPolicy::require_permission(PermissionRequirement::new("EditUsers"));
        assert_eq!(
            authorize(Some(&p), &policy),
            Err(AuthzError::Forbidden("EditUsers".to_string()))
        );
        assert!(authorize(Some(&p), &AuthorizationPolicy::authenticated_user()).is_ok());
    }

    #[test]
    fn role_policies_check_membership() {
        let admins = AuthorizationPolicy::require_role([Role::ADMIN]);
        assert!(authorize(Some(&principal(&[], &[Role::ADMIN])), &admins).is_ok());
        assert!(matches!(
            authorize(Some(&principal(&[], &[Role::USER])), &admins),
            Err(AuthzError::MissingRole(_))
        ));
    }
}
