use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

/// Everything a handler can fail with, mapped onto a status code and a
/// stable `{"error": …}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("service unavailable")]
    Unavailable,
    #[error("internal error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Raw driver errors stay in the log, never in the body.
    fn message(&self) -> String {
        match self {
            ApiError::Database(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(err) = &self {
            tracing::error!(error = %err, "database failure in handler");
        }
        (self.status_code(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::Validation(_) => ApiError::BadRequest(message),
            AuthError::Conflict => ApiError::Conflict(message),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::Unauthorized(message)
            }
            AuthError::Unavailable => ApiError::Unavailable,
        }
    }
}
