use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /view/file/:base64
///
/// The segment is base64 of `{"path": "/storage/<dir>/<file>"}`; the file is served from the upload root.
pub async fn view_file(
    State(state): State<AppState>,
    Path(encoded): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = state.storage.resolve_view(&encoded)?;
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}
