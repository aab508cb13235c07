use axum::extract::{RawQuery, State};
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::trainer::{HIDDEN_FIELDS, TRAINERS_TABLE};
use crate::database::Repository;
use crate::filter::{build_filters, ColumnWhitelist, RequestParams};
use crate::middleware::{ApiResponse, ApiResult, PayloadMode};

/// GET /api/view/trainer
///
/// Filter-builder query over `trainers` without pagination. Hidden columns can be neither
/// filtered on nor returned.
pub async fn view_trainers(State(state): State<AppState>, mode: PayloadMode, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let params = RequestParams::from_query(query.as_deref().unwrap_or_default());
    let columns = state.schema.column_listing(TRAINERS_TABLE).await?;
    let whitelist = ColumnWhitelist::new(columns.into_iter().filter(|c| !HIDDEN_FIELDS.contains(&c.as_str())));

    let filters = build_filters(&params, &whitelist);
    let rows: Vec<Value> = Repository::new(TRAINERS_TABLE, state.pool().clone())
        .select_any(&filters)
        .await?
        .into_iter()
        .map(|mut row| {
            for field in HIDDEN_FIELDS {
                row.remove(field);
            }
            Value::Object(row)
        })
        .collect();

    Ok(ApiResponse::success(mode.seal(&state.codec, &rows)?))
}
