use serde::Serialize;

use warden_core::UserId;

pub use warden_auth::identity::{
    ConfirmEmailRequest, CurrentUserProfile, LoginRequest, LoginResponse, RegisterRequest,
    UserDetails,
};

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
