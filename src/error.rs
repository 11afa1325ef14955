use crate::middleware::error_handling;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("edit window expired (max_edit_minutes: {max_edit_minutes})")]
    EditWindowExpired { max_edit_minutes: i64 },

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("attachment upload failed: {0}")]
    UploadFailed(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidArgument(_) => 400,
            AppError::Unauthenticated => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Unsupported(_) => 405,
            AppError::EditWindowExpired { .. } => 403,
            AppError::UploadFailed(_) => 502,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => 500,
        }
    }
}
