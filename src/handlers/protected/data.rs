use axum::extract::{Path, RawQuery, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{Repository, UpsertOperation, UpsertPlan};
use crate::filter::{build_filters, ColumnWhitelist, FilterOrder, Pagination, RequestParams};
use crate::handlers::allowed_columns;
use crate::middleware::{ApiResponse, ApiResult, PayloadMode, SecurePayload};

/// GET /api/data/:table
///
/// Filtered, sorted, paginated rows. `meta` carries the pagination summary.
pub async fn fetch(
    State(state): State<AppState>,
    mode: PayloadMode,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let columns = allowed_columns(&state, &table).await?;
    let params = RequestParams::from_query(query.as_deref().unwrap_or_default());

    let filters = build_filters(&params, &ColumnWhitelist::new(columns.iter().cloned()));
    let order = FilterOrder::resolve(&params, &columns);
    let page = Pagination::from_params(&params, state.config.data.default_per_page, state.config.data.max_per_page);

    let (rows, total) = Repository::new(&table, state.pool().clone())
        .select_page(&filters, order, page)
        .await?;
    tracing::debug!("Fetched {} of {} rows from {}", rows.len(), total, table);

    Ok(ApiResponse::success(mode.seal(&state.codec, &rows)?).with("meta", json!(page.meta(total))))
}

/// GET /api/data/:table/info
pub async fn table_info(State(state): State<AppState>, Path(table): Path<String>) -> ApiResult<Value> {
    allowed_columns(&state, &table).await?;
    let columns = state.schema.column_types(&table).await?;

    Ok(ApiResponse::ok()
        .with("table", table)
        .with("total_columns", columns.len())
        .with("columns", json!(columns)))
}

/// POST /api/data/:table/upsert
///
/// Sealed record. Rows matching every `unique_by` field are updated, otherwise inserted (201).
pub async fn upsert(State(state): State<AppState>, Path(table): Path<String>, payload: SecurePayload) -> ApiResult<Value> {
    let columns = allowed_columns(&state, &table).await?;
    let primary_key = state.schema.primary_key(&table).await?;

    let plan = UpsertPlan::prepare(&table, payload.data.clone(), &columns, primary_key)?;
    let outcome = Repository::new(&table, state.pool().clone()).upsert(&plan).await?;

    let data = payload.seal(&state, &outcome.record.map(Value::Object).unwrap_or(Value::Null))?;
    let response = match outcome.operation {
        UpsertOperation::Insert => ApiResponse::created(data).with("operation", "insert"),
        UpsertOperation::Update => ApiResponse::success(data).with("operation", "update"),
    };
    Ok(response)
}
