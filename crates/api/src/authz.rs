//! Per-route authorization guard.
//!
//! A guard names a policy (or uses the default policy), asks the
//! `PolicyProvider` for it and evaluates it against the request's
//! `AuthenticatedPrincipal`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, middleware::Next, response::Response};
use tracing::{error, info};

use warden_auth::{AuthenticatedPrincipal, AuthzError, PolicyProvider, authorize};

use crate::app::errors::{INTERNAL_ERROR_MESSAGE, json_error};

#[derive(Clone)]
pub struct PolicyGuard {
    provider: Arc<PolicyProvider>,
    policy: Option<Arc<str>>,
}

impl PolicyGuard {
    pub fn named(provider: Arc<PolicyProvider>, policy: &str) -> Self {
        Self {
            provider,
            policy: Some(Arc::from(policy)),
        }
    }

    pub fn default_policy(provider: Arc<PolicyProvider>) -> Self {
        Self {
            provider,
            policy: None,
        }
    }
}

pub async fn enforce_policy(
    State(guard): State<PolicyGuard>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let policy = match guard.policy.as_deref() {
        Some(name) => match guard.provider.require_policy(name) {
            Ok(policy) => policy,
            Err(e) => {
                error!(error = %e, "route references an unknown authorization policy");
                return json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_ERROR_MESSAGE,
                );
            }
        },
        None => guard.provider.default_policy().clone(),
    };

    let principal = req.extensions().get::<AuthenticatedPrincipal>().cloned();
    match authorize(principal.as_ref(), &policy) {
        Ok(()) => next.run(req).await,
        Err(AuthzError::Unauthenticated) => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "authentication required",
        ),
        Err(e) => {
            info!(
                user_id = %principal.as_ref().map(|p| p.user_id.to_string()).unwrap_or_default(),
                policy = guard.policy.as_deref().unwrap_or("default"),
                reason = %e,
                "authorization denied"
            );
            json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
        }
    }
}
