use axum::extract::{Multipart, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::now;
use crate::middleware::{ApiResponse, ApiResult, PayloadMode};
use crate::services::storage::{StorageError, StoredFile, UploadKind};

/// File part plus the optional `filePath` text field of an upload form
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    file_path: Option<String>,
}

async fn read_form(mut multipart: Multipart, kind: UploadKind) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm { file: None, file_path: None };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            name if name == kind.field() => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "filePath" => {
                form.file_path = Some(field.text().await.map_err(|e| ApiError::bad_request(e.body_text()))?);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn store(state: &AppState, multipart: Multipart, kind: UploadKind) -> Result<StoredFile, ApiError> {
    let form = read_form(multipart, kind).await?;
    let (name, bytes) = form.file.ok_or(StorageError::MissingFile(kind.field()))?;
    Ok(state
        .storage
        .save(kind, form.file_path.as_deref(), &name, &bytes, now())
        .await?)
}

/// POST /api/upload-image
///
/// Multipart `image` (+ `filePath`). Responds with the sealed `{name, path, filename}`.
pub async fn image(State(state): State<AppState>, mode: PayloadMode, multipart: Multipart) -> ApiResult<Value> {
    let stored = store(&state, multipart, UploadKind::Image).await?;
    let body = json!({
        "name": stored.filename,
        "path": format!("{}/storage/{}", state.config.server.public_url, stored.relative_path),
        "filename": stored.filename,
    });
    Ok(ApiResponse::success(mode.seal(&state.codec, &body)?))
}

/// POST /api/upload-doc
pub async fn document(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Value> {
    let stored = store(&state, multipart, UploadKind::Document).await?;
    Ok(ApiResponse::ok()
        .with("filename", stored.filename)
        .with("size", stored.size)
        .with("mime_type", stored.mime_type))
}
