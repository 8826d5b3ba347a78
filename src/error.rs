use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// ApiError
///
/// The application's error taxonomy. Every handler returns `Result<_, ApiError>`,
/// and the translation into an HTTP status plus JSON body happens exactly once,
/// in the `IntoResponse` implementation below.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Duplicate username or email at registration.
    #[error("{0}")]
    Conflict(String),

    /// Unknown email or wrong password. A single message for both cases,
    /// so the endpoint cannot be used to enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No bearer token on a protected route.
    #[error("Access denied")]
    AuthenticationRequired,

    /// A bearer token was presented but failed verification.
    /// Note: this maps to 400, not 401; clients distinguish the two cases.
    #[error("Invalid token")]
    InvalidToken,

    /// Unknown (or unparseable) recipe id.
    #[error("{0}")]
    NotFound(String),

    /// Authenticated caller is not the owner of the target recipe.
    #[error("{0}")]
    Forbidden(String),

    /// Storage or other unexpected failure. Detail is logged, not leaked.
    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            // The auth-flavored errors deliberately carry a bare message body,
            // matching the wire format clients already depend on.
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Invalid credentials" }),
            ),
            ApiError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Access denied" }),
            ),
            ApiError::InvalidToken => {
                (StatusCode::BAD_REQUEST, json!({ "message": "Invalid token" }))
            }
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
