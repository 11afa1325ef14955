//! Attachment upload boundary. The real deployment fronts an object store;
//! the core only ever sees the opaque reference it hands back, and a failed
//! upload must prevent message creation entirely.

use crate::error::AppError;
use crate::models::AttachmentRef;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload(&self, bytes: Bytes, file_name: &str) -> Result<AttachmentRef, AppError>;
}

fn media_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "txt" => "text/plain",
            "doc" | "docx" => "application/msword",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

/// Write-once in-process blob store standing in for the external service.
#[derive(Default)]
pub struct InMemoryUploader {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttachmentUploader for InMemoryUploader {
    async fn upload(&self, bytes: Bytes, file_name: &str) -> Result<AttachmentRef, AppError> {
        if file_name.trim().is_empty() {
            return Err(AppError::UploadFailed("missing file name".into()));
        }
        if bytes.is_empty() {
            return Err(AppError::UploadFailed("empty upload".into()));
        }
        let url = format!("attachment://{}/{}", Uuid::new_v4(), file_name);
        self.objects.write().await.insert(url.clone(), bytes);
        Ok(AttachmentRef {
            url,
            media_type: media_type_for(file_name).to_string(),
            file_name: file_name.to_string(),
        })
    }
}
