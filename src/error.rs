//! Typed API errors + Axum integration.
//!
//! Every handler path ends in either a success value or one of these
//! variants; the boundary renders them as `{"message": …}` JSON. Server-side
//! causes are logged here and never leak into the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::jwt::TokenError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input shape or content (400).
    #[error("{0}")]
    Validation(String),

    /// Duplicate email (409).
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or a missing/invalid/stale token (401).
    #[error("{0}")]
    Authentication(String),

    /// Authenticated, but the role is not permitted (401).
    #[error("{0}")]
    Authorization(String),

    /// Unknown email or resource (404).
    #[error("{0}")]
    NotFound(String),

    /// A collaborator (mailer, store) failed transiently (500).
    #[error("{0}")]
    Dependency(String),

    /// Anything unexpected (500); the cause stays in the logs.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Authentication(_) | ApiError::Authorization(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dependency(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Authentication(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "unhandled internal error");
                "Something went wrong. Please try again later.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
