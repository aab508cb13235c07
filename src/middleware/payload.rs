use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::app::AppState;
use crate::envelope::EnvelopeCodec;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Whether a request talks sealed envelopes or, with a valid development key, plain JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    Sealed,
    Plain,
}

impl PayloadMode {
    pub fn detect(headers: &HeaderMap, dev_key: Option<&str>) -> Self {
        let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        match (dev_key, presented) {
            (Some(expected), Some(given)) if bool::from(expected.as_bytes().ct_eq(given.as_bytes())) => {
                PayloadMode::Plain
            }
            _ => PayloadMode::Sealed,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, PayloadMode::Plain)
    }

    /// Inbound body as a map: decrypted when sealed, taken as-is in plain mode
    pub fn open(&self, codec: &EnvelopeCodec, body: &Value) -> Result<Map<String, Value>, ApiError> {
        match self {
            PayloadMode::Sealed => Ok(codec.decrypt_value(body)?),
            PayloadMode::Plain => body
                .as_object()
                .cloned()
                .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object")),
        }
    }

    /// For endpoints whose clients may post credentials unsealed: an envelope is opened,
    /// any other object is taken as-is
    pub fn open_either(&self, codec: &EnvelopeCodec, body: &Value) -> Result<Map<String, Value>, ApiError> {
        if looks_sealed(body) {
            self.open(codec, body)
        } else {
            PayloadMode::Plain.open(codec, body)
        }
    }

    /// Outbound value: an envelope when sealed, the value itself in plain mode
    pub fn seal<T: Serialize + ?Sized>(&self, codec: &EnvelopeCodec, payload: &T) -> Result<Value, ApiError> {
        match self {
            PayloadMode::Sealed => Ok(codec.encrypt(payload)?.to_value()),
            PayloadMode::Plain => serde_json::to_value(payload).map_err(|e| {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to format response")
            }),
        }
    }
}

/// Body carries any of the envelope fields
pub fn looks_sealed(body: &Value) -> bool {
    ["iv", "data", "mac"].iter().any(|field| body.get(field).is_some())
}

#[async_trait]
impl FromRequestParts<AppState> for PayloadMode {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(PayloadMode::detect(&parts.headers, state.config.security.dev_key.as_deref()))
    }
}

/// Request body opened through the envelope codec
#[derive(Debug, Clone)]
pub struct SecurePayload {
    pub mode: PayloadMode,
    pub data: Map<String, Value>,
}

impl SecurePayload {
    pub fn seal<T: Serialize + ?Sized>(&self, state: &AppState, payload: &T) -> Result<Value, ApiError> {
        self.mode.seal(&state.codec, payload)
    }

    pub fn str(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn require_str(&self, key: &str) -> Result<String, ApiError> {
        self.str(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("The {} field is required.", key)))
    }

    /// Integer ids arrive as numbers or numeric strings
    pub fn require_i64(&self, key: &str) -> Result<i64, ApiError> {
        let value = self.data.get(key);
        value
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .ok_or_else(|| ApiError::bad_request(format!("The {} field must be an integer.", key)))
    }
}

#[async_trait]
impl FromRequest<AppState> for SecurePayload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mode = PayloadMode::detect(req.headers(), state.config.security.dev_key.as_deref());
        let Json(body) = Json::<Value>::from_request(req, state).await.map_err(|rejection| match mode {
            PayloadMode::Sealed => ApiError::InvalidPayload,
            PayloadMode::Plain => ApiError::bad_request(rejection.body_text()),
        })?;
        let data = mode.open(&state.codec, &body)?;
        Ok(SecurePayload { mode, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeKey;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(EnvelopeKey::parse("0".repeat(32).as_bytes()).unwrap())
    }

    fn headers(key: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = key {
            headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        }
        headers
    }

    #[test]
    fn plain_mode_needs_matching_key() {
        assert_eq!(PayloadMode::detect(&headers(Some("dev")), Some("dev")), PayloadMode::Plain);
        assert_eq!(PayloadMode::detect(&headers(Some("nope")), Some("dev")), PayloadMode::Sealed);
        assert_eq!(PayloadMode::detect(&headers(Some("dev-longer")), Some("dev")), PayloadMode::Sealed);
        assert_eq!(PayloadMode::detect(&headers(None), Some("dev")), PayloadMode::Sealed);
    }

    #[test]
    fn no_configured_key_means_always_sealed() {
        assert_eq!(PayloadMode::detect(&headers(Some("")), None), PayloadMode::Sealed);
        assert_eq!(PayloadMode::detect(&headers(Some("anything")), None), PayloadMode::Sealed);
    }

    #[test]
    fn sealed_mode_round_trips() {
        let codec = codec();
        let sealed = PayloadMode::Sealed.seal(&codec, &json!({ "userID": 7 })).unwrap();
        assert!(sealed.get("iv").is_some() && sealed.get("mac").is_some());
        let opened = PayloadMode::Sealed.open(&codec, &sealed).unwrap();
        assert_eq!(opened.get("userID"), Some(&json!(7)));
    }

    #[test]
    fn sealed_mode_rejects_plaintext() {
        let err = PayloadMode::Sealed.open(&codec(), &json!({ "userID": 7 })).unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload));
    }

    #[test]
    fn credentials_may_arrive_either_way() {
        let codec = codec();
        let plain = json!({ "email": "ann@example.com", "password": "pw" });
        let opened = PayloadMode::Sealed.open_either(&codec, &plain).unwrap();
        assert_eq!(opened.get("email"), Some(&json!("ann@example.com")));

        let sealed = PayloadMode::Sealed.seal(&codec, &plain).unwrap();
        let opened = PayloadMode::Sealed.open_either(&codec, &sealed).unwrap();
        assert_eq!(opened.get("password"), Some(&json!("pw")));

        let tampered = json!({ "iv": "AAAA", "data": "AAAA", "mac": "AAAA" });
        assert!(matches!(PayloadMode::Sealed.open_either(&codec, &tampered), Err(ApiError::InvalidPayload)));
    }

    #[test]
    fn plain_mode_passes_through() {
        let codec = codec();
        let value = json!({ "userID": 7 });
        assert_eq!(PayloadMode::Plain.seal(&codec, &value).unwrap(), value);
        assert_eq!(PayloadMode::Plain.open(&codec, &value).unwrap().get("userID"), Some(&json!(7)));
        assert!(PayloadMode::Plain.open(&codec, &json!([1, 2])).is_err());
    }
}
