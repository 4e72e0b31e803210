//! Error types and HTTP response mapping.
//!
//! `AppError` is the single error type returned by handlers and the repository.
//! Client-facing variants carry a message that is returned verbatim; everything
//! else is logged server-side and collapsed into a generic 500 response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{config::ConfigError, storage::StorageError};

/// ErrorBody
///
/// JSON body of every error response: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Payload validation, lifecycle violations and duplicate actions. 400.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired credentials. 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (policy denial, blocked account). 403.
    #[error("{0}")]
    Forbidden(String),

    /// Unknown user, route, waypoint or comment. 404.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Hashing(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Anything else that should never reach a client in detail.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Converts application errors into HTTP responses.
///
/// Client errors echo their message. Server errors are logged with full details
/// and return a generic message so database or storage internals never leak.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
