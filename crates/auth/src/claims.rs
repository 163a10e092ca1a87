use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registered claim names the issuer controls; caller-supplied claims may not reuse them.
pub const RESERVED_CLAIM_NAMES: [&str; 14] = [
    "sub",
    "nameid",
    "given_name",
    "family_name",
    "email",
    "unique_name",
    "jti",
    "role",
    "permission",
    "iss",
    "aud",
    "iat",
    "nbf",
    "exp",
];

/// JWT claims model (wire format).
///
/// Timestamps are seconds since the Unix epoch. Roles and permissions are
/// JSON arrays with one entry per claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: String,

    /// Name identifier (duplicates `sub`).
    pub nameid: String,

    /// Empty string when unset.
    pub given_name: String,

    /// Empty string when unset.
    pub family_name: String,

    /// Empty string when unset.
    pub email: String,

    /// Username.
    pub unique_name: String,

    /// Unique token id.
    pub jti: String,

    /// One entry per role held at issuance time.
    #[serde(default, rename = "role")]
    pub roles: Vec<String>,

    /// One entry per resolved permission at issuance time.
    #[serde(default, rename = "permission")]
    pub permissions: Vec<String>,

    pub iss: String,
    pub aud: String,

    /// Issued-at.
    pub iat: i64,

    /// Not-before (equal to `iat`).
    pub nbf: i64,

    /// Expiration.
    pub exp: i64,

    /// Caller-supplied claims, carried verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("invalid token issuer")]
    InvalidIssuer,

    #[error("invalid token audience")]
    InvalidAudience,
}

/// Deterministically validate the claims' time window.
///
/// A token is valid for `now` in `[iat, exp)`, at one-second resolution.
/// Signature, issuer and audience are checked by `TokenValidator`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat || now < claims.nbf {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
