use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::app::errors::json_error;
use crate::app::services::AppServices;

/// Authenticate the bearer token and attach an `AuthenticatedPrincipal`.
///
/// Anything missing, malformed, expired or wrongly signed is a 401; no
/// policy runs for such requests.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return unauthenticated();
    };

    let principal = match services.validator.validate(token) {
        Ok(principal) => principal,
        Err(e) => {
            debug!(error = %e, "rejected bearer token");
            return unauthenticated();
        }
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn unauthenticated() -> Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "authentication required",
    )
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
