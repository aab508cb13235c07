use serde_json::{Map, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlQueryResult};
use sqlx::{Executor, Row};

use crate::database::manager::DatabaseError;
use crate::database::row::row_to_json;
use crate::filter::SqlResult;

pub type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// Run a rendered SELECT and return every row as a JSON object
pub async fn select_all<'e, E>(executor: E, sql: &SqlResult) -> Result<Vec<Map<String, Value>>, DatabaseError>
where
    E: Executor<'e, Database = MySql>,
{
    let rows = bind_all(sqlx::query(&sql.query), &sql.params).fetch_all(executor).await?;
    rows.iter().map(row_to_json).collect()
}

pub async fn select_optional<'e, E>(executor: E, sql: &SqlResult) -> Result<Option<Map<String, Value>>, DatabaseError>
where
    E: Executor<'e, Database = MySql>,
{
    let row = bind_all(sqlx::query(&sql.query), &sql.params)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(row_to_json).transpose()
}

/// Run a rendered `SELECT COUNT(*) AS count ...`
pub async fn count<'e, E>(executor: E, sql: &SqlResult) -> Result<i64, DatabaseError>
where
    E: Executor<'e, Database = MySql>,
{
    let row = bind_all(sqlx::query(&sql.query), &sql.params).fetch_one(executor).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

pub async fn execute<'e, E>(executor: E, sql: &SqlResult) -> Result<MySqlQueryResult, DatabaseError>
where
    E: Executor<'e, Database = MySql>,
{
    let result = bind_all(sqlx::query(&sql.query), &sql.params).execute(executor).await?;
    Ok(result)
}

pub fn bind_all<'q>(mut q: MySqlQuery<'q>, params: &[Value]) -> MySqlQuery<'q> {
    for p in params {
        q = bind_param_query(q, p);
    }
    q
}

/// Bind one JSON value using the closest MySQL type
pub fn bind_param_query<'q>(q: MySqlQuery<'q>, v: &Value) -> MySqlQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        // Nested structures land in JSON/TEXT columns as their JSON text
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
