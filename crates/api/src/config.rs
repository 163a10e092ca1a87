//! Process configuration, read once at startup.
//!
//! Every JWT setting is validated here so a misconfigured deployment never
//! binds a socket.

use std::env;

use chrono::Duration;
use thiserror::Error;

use warden_auth::{IdentityOptions, JwtSettings, LockoutPolicy};
use warden_infra::{Argon2PasswordHasher, PasswordCost};

/// Longest accepted lockout: one year.
const MAX_LOCKOUT_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Jwt(#[from] warden_auth::ConfigError),

    #[error(transparent)]
    PasswordCost(#[from] warden_auth::HashingError),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtSettings,
    pub identity: IdentityOptions,
    pub password_cost: PasswordCost,
}

impl ApiConfig {
    /// Load from the process environment, honouring a `.env` file if present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let issuer = var("JWT_ISSUER").ok_or(ConfigError::Missing("JWT_ISSUER"))?;
        let audience = var("JWT_AUDIENCE").ok_or(ConfigError::Missing("JWT_AUDIENCE"))?;
        let key = var("JWT_KEY").ok_or(ConfigError::Missing("JWT_KEY"))?;
        let lifetime = parse_or("JWT_LIFETIME_MINUTES", var("JWT_LIFETIME_MINUTES"), 60i64)?;
        let jwt = JwtSettings::new(issuer, audience, key, lifetime)?;

        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = parse_or("API_PORT", var("API_PORT"), 8080u16)?;

        let max_failed_attempts = parse_or(
            "LOCKOUT_MAX_FAILED_ATTEMPTS",
            var("LOCKOUT_MAX_FAILED_ATTEMPTS"),
            5u32,
        )?;
        if max_failed_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "LOCKOUT_MAX_FAILED_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let lockout_minutes = parse_or("LOCKOUT_MINUTES", var("LOCKOUT_MINUTES"), 5i64)?;
        let lockout_duration = Some(lockout_minutes)
            .filter(|m| (1..=MAX_LOCKOUT_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .ok_or_else(|| ConfigError::Invalid {
                name: "LOCKOUT_MINUTES",
                value: lockout_minutes.to_string(),
                reason: format!("must be between 1 and {MAX_LOCKOUT_MINUTES}"),
            })?;

        let lockout = LockoutPolicy {
            max_failed_attempts,
            lockout_duration,
            enabled_for_new_users: true,
        };

        let identity = IdentityOptions {
            require_confirmed_email: parse_bool(
                "REQUIRE_CONFIRMED_EMAIL",
                var("REQUIRE_CONFIRMED_EMAIL"),
                true,
            )?,
            lockout,
            confirmation_url: var("EMAIL_CONFIRMATION_URL")
                .unwrap_or_else(|| IdentityOptions::default().confirmation_url),
            ..IdentityOptions::default()
        };

        let defaults = PasswordCost::default();
        let password_cost = PasswordCost {
            memory_kib: parse_or(
                "ARGON2_MEMORY_KIB",
                var("ARGON2_MEMORY_KIB"),
                defaults.memory_kib,
            )?,
            iterations: parse_or(
                "ARGON2_ITERATIONS",
                var("ARGON2_ITERATIONS"),
                defaults.iterations,
            )?,
            parallelism: parse_or(
                "ARGON2_PARALLELISM",
                var("ARGON2_PARALLELISM"),
                defaults.parallelism,
            )?,
        };
        Argon2PasswordHasher::with_cost(password_cost)?;

        Ok(Self {
            api_host,
            api_port,
            database_url: var("DATABASE_URL"),
            jwt,
            identity,
            password_cost,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("JWT_ISSUER", "warden"),
        ("JWT_AUDIENCE", "warden-clients"),
        ("JWT_KEY", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn defaults_apply_when_only_jwt_is_set() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.jwt.lifetime(), Duration::minutes(60));
        assert!(config.identity.require_confirmed_email);
        assert_eq!(config.identity.lockout.max_failed_attempts, 5);
        assert_eq!(
            config.identity.confirmation_url,
            "http://localhost:3000/confirm-email"
        );
        assert_eq!(config.password_cost, PasswordCost::default());
    }

    #[test]
    fn password_cost_is_checked_at_load() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("ARGON2_MEMORY_KIB", "1024"), ("ARGON2_ITERATIONS", "1")]);
        let config = load(&vars).unwrap();
        assert_eq!(config.password_cost.memory_kib, 1024);
        assert_eq!(config.password_cost.iterations, 1);

        let mut vars = REQUIRED.to_vec();
        vars.push(("ARGON2_ITERATIONS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::PasswordCost(_))));
    }

    #[test]
    fn missing_or_empty_key_is_fatal() {
        let err = load(&REQUIRED[..2]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_KEY")));

        let mut vars = REQUIRED.to_vec();
        vars[2] = ("JWT_KEY", "   ");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("JWT_KEY"))));
    }

    #[test]
    fn short_key_and_bad_numbers_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("JWT_KEY", "too-short");
        assert!(matches!(load(&vars), Err(ConfigError::Jwt(_))));

        let mut vars = REQUIRED.to_vec();
        vars.push(("JWT_LIFETIME_MINUTES", "soon"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "JWT_LIFETIME_MINUTES", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("REQUIRE_CONFIRMED_EMAIL", "maybe"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn lockout_minutes_must_be_positive_and_bounded() {
        for minutes in ["0", "-5", "600000", "9223372036854775807"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("LOCKOUT_MINUTES", minutes));
            assert!(
                matches!(
                    load(&vars),
                    Err(ConfigError::Invalid { name: "LOCKOUT_MINUTES", .. })
                ),
                "{minutes}"
            );
        }

        let mut vars = REQUIRED.to_vec();
        vars.push(("LOCKOUT_MAX_FAILED_ATTEMPTS", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "LOCKOUT_MAX_FAILED_ATTEMPTS", .. })
        ));
    }

    #[test]
    fn oversized_token_lifetime_fails_at_load() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("JWT_LIFETIME_MINUTES", "150000000000"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Jwt(warden_auth::ConfigError::InvalidLifetime(150_000_000_000)))
        ));
    }

    #[test]
    fn overrides_are_honoured() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("API_PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("REQUIRE_CONFIRMED_EMAIL", "false"),
            ("LOCKOUT_MAX_FAILED_ATTEMPTS", "3"),
            ("LOCKOUT_MINUTES", "15"),
            ("JWT_LIFETIME_MINUTES", "5"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.api_port, 9090);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/warden"));
        assert!(!config.identity.require_confirmed_email);
        assert_eq!(config.identity.lockout.max_failed_attempts, 3);
        assert_eq!(config.identity.lockout.lockout_duration, Duration::minutes(15));
        assert_eq!(config.jwt.lifetime(), Duration::minutes(5));
    }
}
