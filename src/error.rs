use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::orchestration::PipelineError> for AppError {
    fn from(err: crate::orchestration::PipelineError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::engine::WholesaleError> for AppError {
    fn from(err: crate::engine::WholesaleError) -> Self {
        use crate::engine::WholesaleError;
        match &err {
            WholesaleError::OrderNotFound(_) => AppError::NotFound(err.to_string()),
            WholesaleError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            WholesaleError::MissingMapping(_) | WholesaleError::PartnershipNotFound { .. } => {
                AppError::BadRequest(err.to_string())
            }
            WholesaleError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<crate::engine::InventoryError> for AppError {
    fn from(err: crate::engine::InventoryError) -> Self {
        use crate::engine::InventoryError;
        match &err {
            InventoryError::OrderNotFound(_) => AppError::NotFound(err.to_string()),
            InventoryError::AlreadyVerified(_) | InventoryError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            InventoryError::UnknownItem { .. } => AppError::BadRequest(err.to_string()),
            InventoryError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
