use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Wire shape for every failure leaving the service.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub code: String,
}

/// Map domain errors to HTTP responses; nothing crosses this boundary as a
/// panic.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match err {
        AppError::Unauthenticated => "UNAUTHENTICATED",
        AppError::Forbidden(_) => "FORBIDDEN",
        AppError::NotFound(_) => "NOT_FOUND",
        AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
        AppError::EditWindowExpired { .. } => "EDIT_WINDOW_EXPIRED",
        AppError::Unsupported(_) => "UNSUPPORTED",
        AppError::UploadFailed(_) => "UPLOAD_FAILED",
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            "INTERNAL_SERVER_ERROR"
        }
    };

    let error = match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::METHOD_NOT_ALLOWED => "Method Not Allowed",
        StatusCode::BAD_GATEWAY => "Bad Gateway",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Error",
    };

    let response = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status: status.as_u16(),
        code: code.to_string(),
    };
    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}
