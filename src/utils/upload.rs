//! Multipart uploads into the blob store.

use alicia_http::{ApiResult, AppError};
use alicia_kernel::AppContext;
use alicia_storage::{object_key, StoredObject};
use axum::{body::Bytes, extract::Multipart};

pub const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Read the part named `field`, ignoring any other parts.
pub async fn read_file(mut multipart: Multipart, field: &str) -> ApiResult<UploadedFile> {
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().unwrap_or("upload").to_string();
        let content_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = part
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        if bytes.is_empty() {
            return Err(missing(field, "file is empty"));
        }
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(missing(field, "required"))
}

fn missing(field: &str, error: &str) -> AppError {
    AppError::validation(
        vec![serde_json::json!({"field": field, "error": error})],
        "invalid upload",
    )
}

impl UploadedFile {
    pub fn require_type(&self, field: &str, allowed: &[&str]) -> ApiResult<()> {
        if allowed.contains(&self.content_type.as_str()) {
            Ok(())
        } else {
            Err(missing(
                field,
                &format!("unsupported content type '{}'", self.content_type),
            ))
        }
    }

    /// Upload under `{prefix..}/{file_name}`.
    pub async fn store(&self, app: &AppContext, prefix: &[&str]) -> ApiResult<StoredObject> {
        let key = object_key(prefix, &self.file_name);
        let stored = app
            .blobs
            .upload(&key, &self.bytes, &self.content_type)
            .await?;
        tracing::info!(path = %stored.path, size = stored.size, "file uploaded");
        Ok(stored)
    }
}
