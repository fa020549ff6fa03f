use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::api::envelope::ApiResponse;
use crate::api::extract::Json;
use crate::app::AppState;
use crate::error::AppError;
use crate::storage::client::StorageClient;

/// Largest accepted image, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Response from a successful image upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public URL of the stored image.
    pub url: String,
    /// Object key inside the bucket.
    pub key: String,
}

fn extension_for(content_type: &str, file_name: &str) -> Option<&'static str> {
    let ext = match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        _ => {
            // Browsers sometimes send a generic image type; trust the name then.
            let lower = file_name.to_lowercase();
            return ["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico"]
                .into_iter()
                .find(|ext| lower.ends_with(&format!(".{ext}")));
        }
    };
    Some(ext)
}

/// Content-addressed key: identical images map to the same object.
pub fn object_key(data: &[u8], ext: &str) -> String {
    let digest = Sha256::digest(data);
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("icons/{hex}.{ext}")
}

/// Validate and store one image. Separated from the multipart plumbing so
/// it can be tested with a mock storage client.
pub async fn process_upload(
    storage: &dyn StorageClient,
    file_name: &str,
    content_type: &str,
    data: Vec<u8>,
) -> Result<UploadResponse, AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest("Only image files are allowed".into()));
    }
    if data.is_empty() {
        return Err(AppError::BadRequest("File is empty".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(format!(
            "File exceeds the {} MiB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    let ext = extension_for(content_type, file_name)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported image type: {content_type}")))?;

    let key = object_key(&data, ext);
    let size = data.len();
    storage.put_object(&key, data, content_type).await?;

    tracing::info!(key = %key, size, "Image uploaded");

    Ok(UploadResponse {
        url: storage.public_url(&key),
        key,
    })
}

/// Axum handler for `POST /api/v1/upload`.
///
/// Accepts a multipart form with a single file field named "file".
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let storage = state.storage()?;
    let mut multipart = multipart?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;

        let uploaded = process_upload(storage, &file_name, &content_type, data.to_vec()).await?;
        return Ok(Json(ApiResponse::ok(uploaded)));
    }

    Err(AppError::BadRequest("No file field found in request".into()))
}
