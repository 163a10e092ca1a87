//! Closed permission catalog.
//!
//! Permissions travel as plain strings inside tokens and policy names; this
//! enum is the authoritative list of values a role may be granted.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claim type under which permissions are stored on roles and embedded in tokens.
pub const PERMISSION_CLAIM_TYPE: &str = "permission";

/// Policy-name prefix recognised by the policy resolver (`"permission:ViewUsers"`).
pub const PERMISSION_POLICY_PREFIX: &str = "permission:";

/// A fine-grained capability that gates specific operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    // User management
    ViewUsers,
    CreateUsers,
    EditUsers,
    DeleteUsers,

    // Feature X
    ViewFeatureX,
    ManageFeatureX,

    // Reports
    GenerateReportA,
    ViewReportB,
}

impl Permission {
    /// Every permission in the catalog, in declaration order.
    pub const ALL: [Permission; 8] = [
        Permission::ViewUsers,
        Permission::CreateUsers,
        Permission::EditUsers,
        Permission::DeleteUsers,
        Permission::ViewFeatureX,
        Permission::ManageFeatureX,
        Permission::GenerateReportA,
        Permission::ViewReportB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewUsers => "ViewUsers",
            Permission::CreateUsers => "CreateUsers",
            Permission::EditUsers => "EditUsers",
            Permission::DeleteUsers => "DeleteUsers",
            Permission::ViewFeatureX => "ViewFeatureX",
            Permission::ManageFeatureX => "ManageFeatureX",
            Permission::GenerateReportA => "GenerateReportA",
            Permission::ViewReportB => "ViewReportB",
        }
    }

    /// Policy name that requires this permission (`"permission:<Name>"`).
    pub fn policy_name(&self) -> String {
        format!("{PERMISSION_POLICY_PREFIX}{}", self.as_str())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}
