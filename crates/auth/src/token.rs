//! Token issuance and validation (HS256 JWT).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::aggregator::ClaimsAggregator;
use crate::claims::{JwtClaims, RESERVED_CLAIM_NAMES, TokenValidationError, validate_claims};
use crate::principal::AuthenticatedPrincipal;
use crate::roles::Role;
use crate::store::StoreError;
use crate::user::UserAccount;

/// Minimum signing-key length in bytes (256 bits for HMAC-SHA-256).
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_LIFETIME_MINUTES: i64 = 365 * 24 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT signing key is not configured")]
    MissingSigningKey,

    #[error("JWT signing key must be at least {min} bytes, got {actual}")]
    SigningKeyTooShort { min: usize, actual: usize },

    #[error("JWT issuer is not configured")]
    MissingIssuer,

    #[error("JWT audience is not configured")]
    MissingAudience,

    #[error(
        "JWT lifetime must be between 1 and {max} minutes, got {0}",
        max = MAX_TOKEN_LIFETIME_MINUTES
    )]
    InvalidLifetime(i64),
}

/// Immutable token signing configuration, validated on construction.
#[derive(Clone)]
pub struct JwtSettings {
    issuer: String,
    audience: String,
    key: String,
    lifetime: Duration,
}

impl JwtSettings {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        key: impl Into<String>,
        lifetime_minutes: i64,
    ) -> Result<Self, ConfigError> {
        let issuer = issuer.into();
        let audience = audience.into();
        let key = key.into();

        if key.is_empty() {
            return Err(ConfigError::MissingSigningKey);
        }
        if key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::SigningKeyTooShort {
                min: MIN_SIGNING_KEY_BYTES,
                actual: key.len(),
            });
        }
        if issuer.trim().is_empty() {
            return Err(ConfigError::MissingIssuer);
        }
        if audience.trim().is_empty() {
            return Err(ConfigError::MissingAudience);
        }
        let lifetime = Some(lifetime_minutes)
            .filter(|m| (1..=MAX_TOKEN_LIFETIME_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .ok_or(ConfigError::InvalidLifetime(lifetime_minutes))?;

        Ok(Self {
            issuer,
            audience,
            key,
            lifetime,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

impl core::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Issuer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("claim '{0}' is reserved and cannot be supplied by the caller")]
    ReservedClaim(String),

    #[error("token expiry is out of range for issuance time {0}")]
    ExpiryOutOfRange(DateTime<Utc>),

    #[error("failed to resolve permissions: {0}")]
    Store(#[from] StoreError),

    #[error("failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Builds signed, time-limited tokens carrying identity, role and permission claims.
#[derive(Clone)]
pub struct TokenIssuer {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    aggregator: ClaimsAggregator,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings, aggregator: ClaimsAggregator) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.key.as_bytes());
        Self {
            settings,
            encoding_key,
            aggregator,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Issue a token for `user` holding `roles`, valid from now.
    pub async fn issue(
        &self,
        user: &UserAccount,
        roles: &[Role],
        additional_claims: BTreeMap<String, serde_json::Value>,
    ) -> Result<String, TokenError> {
        self.issue_at(user, roles, additional_claims, Utc::now()).await
    }

    /// Issue a token as of `now`. Permissions are a snapshot taken here.
    pub async fn issue_at(
        &self,
        user: &UserAccount,
        roles: &[Role],
        additional_claims: BTreeMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if let Some(name) = additional_claims
            .keys()
            .find(|k| RESERVED_CLAIM_NAMES.contains(&k.as_str()))
        {
            return Err(TokenError::ReservedClaim(name.clone()));
        }

        let permissions = self.aggregator.resolve_permissions(roles).await?;

        let issued_at = now.timestamp();
        let expires_at = now
            .checked_add_signed(self.settings.lifetime)
            .ok_or(TokenError::ExpiryOutOfRange(now))?
            .timestamp();
        let user_id = user.id.to_string();

        let claims = JwtClaims {
            sub: user_id.clone(),
            nameid: user_id,
            given_name: user.first_name.clone().unwrap_or_default(),
            family_name: user.last_name.clone().unwrap_or_default(),
            email: user.email.clone(),
            unique_name: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            permissions: permissions.iter().map(|p| p.as_str().to_string()).collect(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at,
            extra: additional_claims,
        };

        debug!(
            user_id = %user.id,
            roles = claims.roles.len(),
            permissions = claims.permissions.len(),
            "issuing token"
        );

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator
// ─────────────────────────────────────────────────────────────────────────────

/// Verifies presented tokens and reconstructs the principal.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Time window is enforced by `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(settings.key.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<AuthenticatedPrincipal, TokenValidationError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedPrincipal, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                ErrorKind::InvalidIssuer => TokenValidationError::InvalidIssuer,
                ErrorKind::InvalidAudience => TokenValidationError::InvalidAudience,
                ErrorKind::ExpiredSignature => TokenValidationError::Expired,
                ErrorKind::ImmatureSignature => TokenValidationError::NotYetValid,
                _ => TokenValidationError::Malformed(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, now)?;
        AuthenticatedPrincipal::from_claims(&data.claims)
    }
}
