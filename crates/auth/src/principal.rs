use std::collections::BTreeSet;

use warden_core::UserId;

use crate::claims::{JwtClaims, TokenValidationError};
use crate::roles::Role;

/// The authenticated identity behind a request.
///
/// Built once from a validated token; authorization checks read these typed
/// fields instead of re-filtering a raw claim list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    /// Roles in the order they appear in the token.
    pub roles: Vec<Role>,
    /// Permission names as embedded at issuance time.
    pub permissions: BTreeSet<String>,
    pub token_id: String,
}

impl AuthenticatedPrincipal {
    pub fn from_claims(claims: &JwtClaims) -> Result<Self, TokenValidationError> {
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        Ok(Self {
            user_id,
            username: claims.unique_name.clone(),
            email: claims.email.clone(),
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            roles: claims.roles.iter().cloned().map(Role::new).collect(),
            permissions: claims.permissions.iter().cloned().collect(),
            token_id: claims.jti.clone(),
        })
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
