//! Registration, login and email confirmation. No token required.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::dto::{
    ConfirmEmailRequest, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse,
};
use crate::app::errors::identity_error_to_response;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/confirm-email", post(confirm_email))
}

/// POST /api/auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<RegisterRequest>,
) -> axum::response::Response {
    match services.identity.register(req).await {
        Ok(user_id) => (StatusCode::CREATED, Json(RegisterResponse { user_id })).into_response(),
        Err(e) => identity_error_to_response(e),
    }
}

/// POST /api/auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<LoginRequest>,
) -> axum::response::Response {
    match services.identity.login(req).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => identity_error_to_response(e),
    }
}

/// POST /api/auth/confirm-email
pub async fn confirm_email(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<ConfirmEmailRequest>,
) -> axum::response::Response {
    match services.identity.confirm_email(req).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Email confirmed successfully.",
            }),
        )
            .into_response(),
        Err(e) => identity_error_to_response(e),
    }
}
