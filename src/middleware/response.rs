use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// `{"status": .., "data": .., ..extra}` envelope shared by every endpoint
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: bool,
    pub data: Option<T>,
    pub extra: Map<String, Value>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            status: true,
            data: Some(data),
            extra: Map::new(),
            status_code: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::success(data).with_status(StatusCode::CREATED)
    }

    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Extra top-level field next to `data`
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn flag(mut self, status: bool) -> Self {
        self.status = status;
        self
    }
}

impl ApiResponse<Value> {
    /// Bare `{"status": true}`
    pub fn ok() -> Self {
        Self {
            status: true,
            data: None,
            extra: Map::new(),
            status_code: None,
        }
    }

    /// Business-rule refusal: HTTP 200 with `status: false`
    pub fn failure(error: &str, message: impl Into<String>) -> Self {
        Self::ok().flag(false).with("error", error).with("message", message.into())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut body = Map::new();
        body.insert("status".to_string(), Value::Bool(self.status));

        if let Some(data) = &self.data {
            match serde_json::to_value(data) {
                Ok(value) => {
                    body.insert("data".to_string(), value);
                }
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "status": false,
                            "error": "INTERNAL_SERVER_ERROR",
                            "message": "Failed to serialize response data"
                        })),
                    )
                        .into_response();
                }
            }
        }
        body.extend(self.extra);

        (status, Json(Value::Object(body))).into_response()
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
