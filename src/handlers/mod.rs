// Handlers by security tier:
// public (no auth) and protected (bearer JWT, see middleware::auth)
pub mod protected;
pub mod public;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use chrono::{NaiveDateTime, Utc};

use crate::app::AppState;
use crate::error::ApiError;

/// `error` label used by every refused login-style request
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Caller address: first `X-Forwarded-For` hop, else the socket peer
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

/// Columns of a table reachable through the data endpoints.
/// 403 when not allowed, 404 when it does not exist.
pub(crate) async fn allowed_columns(state: &AppState, table: &str) -> Result<Vec<String>, ApiError> {
    if !state.config.data.table_allowed(table) {
        tracing::warn!("Rejected access to table '{}'", table);
        return Err(ApiError::forbidden(format!("Table '{}' is not allowed", table)));
    }
    let columns = state.schema.column_listing(table).await?;
    if columns.is_empty() {
        return Err(ApiError::not_found(format!("Table '{}' does not exist", table)));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        let peer = ConnectInfo("127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let peer = ConnectInfo("127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)).as_deref(), Some("127.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
