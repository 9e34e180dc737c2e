//! Image uploads, stored under `upload_dir` and served from `/uploads`.

use std::path::Path;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use super::extract::RequireUser;

/// Extensions kept on stored files.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Pick a safe extension from the client file name, falling back to the content type.
fn image_extension(file_name: Option<&str>, content_type: &str) -> Option<&'static str> {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext));
    from_name.or(match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    })
}

/// Write one multipart file to disk and return its public URL.
pub(crate) async fn store_image(
    state: &AppState,
    field: Field<'_>,
    form_field: &str,
) -> Result<String, ApiError> {
    let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(ApiError::invalid(form_field, "must be an image"));
    }
    let extension = image_extension(field.file_name(), &content_type)
        .ok_or_else(|| ApiError::invalid(form_field, "must be a png, jpg, gif or webp image"))?;

    let bytes = field.bytes().await?;
    if bytes.is_empty() {
        return Err(ApiError::invalid(form_field, "must not be empty"));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge);
    }

    let name = format!("{}.{extension}", Uuid::new_v4().simple());
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(ApiError::internal)?;
    tokio::fs::write(state.config.upload_dir.join(&name), &bytes)
        .await
        .map_err(ApiError::internal)?;
    info!(file = %name, bytes = bytes.len(), "image stored");

    Ok(format!("{}/uploads/{name}", state.config.public_base()))
}

/// `POST /v1/upload/image` (multipart field `image`)
pub async fn upload_image(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            let url = store_image(&state, field, "image").await?;
            return Ok((StatusCode::CREATED, Json(json!({ "url": url }))));
        }
    }
    Err(ApiError::invalid("image", "must be provided"))
}
