use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Message returned for every 500; the cause is only ever logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Failures that can happen while talking to the data source.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("Failed to encode audit payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Per-message delivery failures. These are recorded by the dispatcher and
/// never abort a run.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Invalid recipient address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A malformed event, detected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.0)
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Dependency failure: {0}")]
    Dependency(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Dependency(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller. Server-side failures collapse to a
    /// fixed string.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::PayloadTooLarge(m) => m.clone(),
            ApiError::Dependency(_) | ApiError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                name = "api.error.internal",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %self,
                message = "Request failed with an internal error"
            );
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
