use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::UserId;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
}

/// `user_id` stays a string so a malformed id is reported, not rejected by the decoder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmEmailRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub code: String,
}

/// Directory entry: roles from the store, permissions resolved live.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_confirmed: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// The caller's own profile; `permissions` are the ones carried by the token.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_confirmed: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
