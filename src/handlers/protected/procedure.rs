use axum::extract::State;
use serde_json::Value;

use crate::app::AppState;
use crate::database::query_builder;
use crate::error::ApiError;
use crate::filter::filter::validate_identifier;
use crate::filter::{quote_identifier, SqlResult};
use crate::middleware::{ApiResponse, ApiResult, SecurePayload};

/// POST /api/call/procedure
///
/// Sealed `{procName, dataParams}`; parameters are bound positionally.
pub async fn call(State(state): State<AppState>, payload: SecurePayload) -> ApiResult<Value> {
    let name = payload.require_str("procName")?;
    if !state.config.data.procedure_allowed(&name) || validate_identifier(&name).is_err() {
        tracing::warn!("Rejected procedure call '{}'", name);
        return Err(ApiError::bad_request("Invalid procedure name"));
    }

    let params = match payload.data.get("dataParams") {
        Some(Value::Array(items)) => items.clone(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return Err(ApiError::bad_request("Invalid data params")),
    };

    let sql = call_statement(&name, params);
    let rows = query_builder::select_all(state.pool(), &sql).await.map_err(|e| {
        tracing::error!("Procedure {} failed: {}", name, e);
        ApiError::bad_request("Procedure call failed")
    })?;

    Ok(ApiResponse::success(payload.seal(&state, &rows)?))
}

fn call_statement(name: &str, params: Vec<Value>) -> SqlResult {
    let placeholders = vec!["?"; params.len()].join(", ");
    SqlResult {
        query: format!("CALL {}({})", quote_identifier(name), placeholders),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_binds_every_param() {
        let sql = call_statement("sp_report", vec![json!(7), json!("2024-01-01")]);
        assert_eq!(sql.query, "CALL `sp_report`(?, ?)");
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn call_without_params() {
        assert_eq!(call_statement("sp_ping", vec![]).query, "CALL `sp_ping`()");
    }
}
