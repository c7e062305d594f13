use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::llm::ModelError;

/// Error type shared by every handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("daily limit of {limit} calls reached for {endpoint}")]
    RateLimited { endpoint: String, limit: i32 },

    #[error("external service failed: {0}")]
    External(String),

    #[error("model response could not be formatted: {0}")]
    Formatting(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::External(_)
            | AppError::Formatting(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Id-addressed access check: 404 when the row is absent, 403 when another
/// user owns it.
pub fn ensure_owner(what: &'static str, owner: Option<Uuid>, user_id: Uuid) -> AppResult<()> {
    match owner {
        None => Err(AppError::NotFound(what)),
        Some(owner) if owner != user_id => {
            warn!(%user_id, %owner, what, "access to foreign row denied");
            Err(AppError::Forbidden)
        }
        Some(_) => Ok(()),
    }
}

impl From<ModelError> for AppError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Formatting { message, raw } => {
                warn!(error = %message, raw = %raw, "model output rejected");
                AppError::Formatting(message)
            }
            other => {
                error!(error = %other, "model call failed");
                AppError::External("the recipe assistant is unavailable, try again later".into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({ "errors": errors }),
            AppError::Database(e) => {
                error!(error = %e, "database error");
                json!({ "error": "internal server error" })
            }
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                json!({ "error": "internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
