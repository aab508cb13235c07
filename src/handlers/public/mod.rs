// Public handlers: no authentication required.
// Token acquisition, registration helpers, mail and file serving.
pub mod auth;
pub mod files;
pub mod mail;
pub mod trainer;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "status": true,
        "data": {
            "name": "Trainer Admin API",
            "version": version,
            "endpoints": {
                "auth": "/api/auth/* (login, register, refresh, reset, staging public; the rest protected)",
                "data": "/api/data/:table[/info|/upsert] (protected)",
                "procedure": "/api/call/procedure (protected)",
                "upload": "/api/upload-image, /api/upload-doc (protected)",
                "email": "/api/email/send, /api/email/reset (public)",
                "files": "/view/file/:base64, /images/:file, /doc/:file (public)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.database.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
