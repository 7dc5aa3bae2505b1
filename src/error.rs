use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The closed set of failures surfaced to the endpoint layer. Authentication
/// failures (401) and authorization failures (403) are distinct variants and
/// must never be conflated: a request that presented no usable identity is
/// `InvalidCredential`/`PrincipalNotFound`, while a resolved identity lacking
/// the required role is `Forbidden`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed, unverifiable, or expired bearer token.
    #[error("invalid or expired credential")]
    InvalidCredential,

    /// Token decoded cleanly but no backing account record exists.
    #[error("no account found for credential")]
    PrincipalNotFound,

    /// Resolved principal lacks the required role.
    #[error("insufficient permissions")]
    Forbidden,

    /// A requested record does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Reorder/remove target key absent from its collection.
    #[error("no item with the given key in this collection")]
    ItemNotFound,

    /// Requested priority is outside the collection's dense range.
    #[error("priority {given} out of range for a collection of {len} items")]
    InvalidPriority { given: i32, len: usize },

    /// Client supplied an unusable payload.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness conflict, e.g. an already-registered email.
    #[error("{0}")]
    Conflict(&'static str),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),

    /// An external identity provider (Google) rejected or failed the request.
    #[error("upstream authentication provider error")]
    Upstream,

    #[error("internal error")]
    Internal(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredential | ApiError::PrincipalNotFound => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::ItemNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidPriority { .. } | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Upstream => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failure details stay in the logs, not in the response body.
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
