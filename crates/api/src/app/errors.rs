use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use warden_auth::IdentityError;

pub const INTERNAL_ERROR_MESSAGE: &str = "an internal error occurred";

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Same shape as [`json_error`] plus an `errors` list.
pub fn json_errors(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    errors: Vec<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "errors": errors,
        })),
    )
        .into_response()
}

/// Generic 500; the cause goes to the log only.
pub fn internal_error(context: &str, err: &dyn std::error::Error) -> axum::response::Response {
    error!(error = %err, context, "request failed with an internal error");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        INTERNAL_ERROR_MESSAGE,
    )
}

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::Validation(errors) => json_errors(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "One or more validation errors occurred.",
            errors,
        ),
        IdentityError::InvalidCredentials
        | IdentityError::EmailNotConfirmed
        | IdentityError::LockedOut => json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_failed",
            err.to_string(),
        ),
        IdentityError::InvalidUserId
        | IdentityError::UnableToConfirm
        | IdentityError::InvalidConfirmationCode => json_error(
            StatusCode::BAD_REQUEST,
            "confirmation_failed",
            err.to_string(),
        ),
        IdentityError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "User not found")
        }
        IdentityError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        IdentityError::Store(ref e) => internal_error("identity store", e),
        IdentityError::Token(ref e) => internal_error("token issuance", e),
        IdentityError::Hashing(ref e) => internal_error("password hashing", e),
    }
}
