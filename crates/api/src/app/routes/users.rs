//! User directory. Everything here sits behind the auth middleware.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use warden_auth::{AuthenticatedPrincipal, Permission, PolicyProvider};
use warden_core::UserId;

use crate::app::errors::{identity_error_to_response, json_error};
use crate::app::services::AppServices;
use crate::authz::{PolicyGuard, enforce_policy};

pub fn router(policies: Arc<PolicyProvider>) -> Router {
    let view_users = Router::new()
        .route("/api/user", get(list_users))
        .route("/api/user/:id", get(get_user))
        .route_layer(axum::middleware::from_fn_with_state(
            PolicyGuard::named(policies.clone(), &Permission::ViewUsers.policy_name()),
            enforce_policy,
        ));

    let authenticated = Router::new()
        .route("/api/user/me", get(current_user))
        .route_layer(axum::middleware::from_fn_with_state(
            PolicyGuard::default_policy(policies),
            enforce_policy,
        ));

    view_users.merge(authenticated)
}

/// GET /api/user
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.identity.list_users().await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => identity_error_to_response(e),
    }
}

/// GET /api/user/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<UserId>() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "Invalid user ID format.",
        );
    };

    match services.identity.user_by_id(id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => identity_error_to_response(e),
    }
}

/// GET /api/user/me
pub async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> axum::response::Response {
    match services.identity.current_user(&principal).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(e) => identity_error_to_response(e),
    }
}
