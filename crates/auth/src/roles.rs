use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, RoleId};

use crate::permissions::{PERMISSION_CLAIM_TYPE, Permission};

/// Role name used for RBAC.
///
/// Roles are opaque strings at this layer; the permissions a role grants are
/// stored as role claims and resolved through a `RoleStore`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("Admin"));
    pub const USER: Role = Role(Cow::Borrowed("User"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: Role,
}

impl RoleRecord {
    pub fn new(name: Role) -> Self {
        Self {
            id: RoleId::new(),
            name,
        }
    }
}

/// A typed key/value claim attached to a role.
///
/// Claims of type `"permission"` always carry a catalog permission name;
/// construction rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleClaim {
    claim_type: String,
    claim_value: String,
}

impl RoleClaim {
    pub fn new(
        claim_type: impl Into<String>,
        claim_value: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let claim_type = claim_type.into();
        let claim_value = claim_value.into();

        if claim_type.trim().is_empty() {
            return Err(DomainError::validation("claim type cannot be empty"));
        }
        if claim_type == PERMISSION_CLAIM_TYPE && claim_value.parse::<Permission>().is_err() {
            return Err(DomainError::invariant(format!(
                "'{claim_value}' is not a known permission"
            )));
        }

        Ok(Self {
            claim_type,
            claim_value,
        })
    }

    pub fn permission(permission: Permission) -> Self {
        Self {
            claim_type: PERMISSION_CLAIM_TYPE.to_string(),
            claim_value: permission.as_str().to_string(),
        }
    }

    pub fn claim_type(&self) -> &str {
        &self.claim_type
    }

    pub fn claim_value(&self) -> &str {
        &self.claim_value
    }

    /// The permission carried by this claim, if it is a permission claim.
    pub fn as_permission(&self) -> Option<Permission> {
        if self.claim_type != PERMISSION_CLAIM_TYPE {
            return None;
        }
        self.claim_value.parse().ok()
    }
}
