use crate::middleware::guards::User;
use crate::models::AttachmentRef;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct UploadParams {
    pub file_name: String,
}

/// Raw-body upload. The returned reference is what a later send attaches;
/// uploading alone never creates a message.
pub async fn upload_attachment(
    State(state): State<AppState>,
    User(_caller): User,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<AttachmentRef>), crate::error::AppError> {
    let attachment = state.uploader.upload(body, &params.file_name).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}
