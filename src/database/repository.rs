use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;

use crate::database::manager::DatabaseError;
use crate::database::query_builder;
use crate::database::row::DATETIME_FORMAT;
use crate::filter::{
    quote_identifier, Condition, FilterDescriptor, FilterOp, FilterOrderInfo, Pagination, SelectQuery, SqlResult,
};

/// Generic access to one whitelisted table, rows as JSON objects
pub struct Repository {
    table_name: String,
    pool: MySqlPool,
}

impl Repository {
    pub fn new(table_name: impl Into<String>, pool: MySqlPool) -> Self {
        Self { table_name: table_name.into(), pool }
    }

    pub async fn select_any(&self, filters: &[FilterDescriptor]) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let query = SelectQuery::filtered(&self.table_name, filters)?;
        query_builder::select_all(&self.pool, &query.to_sql()).await
    }

    /// One page of filtered rows plus the unpaginated total
    pub async fn select_page(
        &self,
        filters: &[FilterDescriptor],
        order: Vec<FilterOrderInfo>,
        page: Pagination,
    ) -> Result<(Vec<Map<String, Value>>, i64), DatabaseError> {
        let mut query = SelectQuery::filtered(&self.table_name, filters)?;
        let total = query_builder::count(&self.pool, &query.to_count_sql()).await?;

        query.order(order).limit(page.limit, page.offset);
        let rows = query_builder::select_all(&self.pool, &query.to_sql()).await?;
        Ok((rows, total))
    }

    /// Insert or update one record inside a transaction
    pub async fn upsert(&self, plan: &UpsertPlan) -> Result<UpsertOutcome, DatabaseError> {
        let now = Utc::now().naive_utc().format(DATETIME_FORMAT).to_string();
        let mut tx = self.pool.begin().await?;

        let existing = match plan.lookup_sql()? {
            Some(sql) => query_builder::select_optional(&mut *tx, &sql).await?,
            None => None,
        };

        let (operation, record) = if existing.is_some() {
            query_builder::execute(&mut *tx, &plan.update_sql(&now)).await?;
            let record = match plan.lookup_sql()? {
                Some(sql) => query_builder::select_optional(&mut *tx, &sql).await?,
                None => None,
            };
            (UpsertOperation::Update, record)
        } else {
            let result = query_builder::execute(&mut *tx, &plan.insert_sql(&now)).await?;
            let record = match plan.reload_sql(result.last_insert_id())? {
                Some(sql) => query_builder::select_optional(&mut *tx, &sql).await?,
                None => None,
            };
            (UpsertOperation::Insert, record)
        };

        tx.commit().await?;
        tracing::info!("Upsert {:?} on {}", operation, self.table_name);
        Ok(UpsertOutcome { operation, record })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOperation {
    Insert,
    Update,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub operation: UpsertOperation,
    pub record: Option<Map<String, Value>>,
}

/// Validated upsert against a known column list. Built without touching the database.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    table: String,
    primary_key: String,
    lookup: Vec<Condition>,
    data: Vec<(String, Value)>,
    has_updated_at: bool,
    has_created_at: bool,
}

impl UpsertPlan {
    pub const DEFAULT_UNIQUE_FIELD: &'static str = "ID";

    /// `unique_by` may be a JSON-encoded array string or a sequence; it defaults to `["ID"]`.
    pub fn prepare(
        table: &str,
        mut payload: Map<String, Value>,
        columns: &[String],
        primary_key: Option<String>,
    ) -> Result<Self, DatabaseError> {
        let unique_fields = parse_unique_by(payload.remove("unique_by"))?;

        for field in &unique_fields {
            if !columns.contains(field) {
                return Err(DatabaseError::Validation(format!(
                    "Field '{}' does not exist in table '{}'. Available columns: {}",
                    field,
                    table,
                    columns.join(", ")
                )));
            }
        }

        let lookup = unique_fields
            .iter()
            .filter_map(|field| match payload.get(field) {
                Some(value) if !value.is_null() => Some(Condition::new(field, FilterOp::Eq, value.clone())),
                _ => None,
            })
            .collect();

        let data: Vec<(String, Value)> = payload
            .into_iter()
            .filter(|(key, value)| columns.contains(key) && !value.is_null())
            .collect();

        if data.is_empty() {
            return Err(DatabaseError::Validation("No valid data provided".to_string()));
        }

        Ok(Self {
            table: table.to_string(),
            primary_key: primary_key.unwrap_or_else(|| guess_primary_key(table, columns)),
            lookup,
            data,
            has_updated_at: columns.iter().any(|c| c == "updated_at"),
            has_created_at: columns.iter().any(|c| c == "created_at"),
        })
    }

    pub fn data(&self) -> &[(String, Value)] {
        &self.data
    }

    /// `None` when no unique field carried a value, meaning always insert
    fn lookup_sql(&self) -> Result<Option<SqlResult>, DatabaseError> {
        if self.lookup.is_empty() {
            return Ok(None);
        }
        let filters: Vec<FilterDescriptor> = self.lookup.iter().cloned().map(FilterDescriptor::Simple).collect();
        let mut query = SelectQuery::filtered(&self.table, &filters)?;
        query.limit(1, 0);
        Ok(Some(query.to_sql()))
    }

    fn reload_sql(&self, last_insert_id: u64) -> Result<Option<SqlResult>, DatabaseError> {
        if last_insert_id > 0 {
            let condition = Condition::new(&self.primary_key, FilterOp::Eq, Value::from(last_insert_id));
            let mut query = SelectQuery::filtered(&self.table, &[FilterDescriptor::Simple(condition)])?;
            query.limit(1, 0);
            return Ok(Some(query.to_sql()));
        }
        // No auto-increment key; fall back to the unique lookup
        self.lookup_sql()
    }

    fn stamped(&self, now: &str, inserting: bool) -> Vec<(String, Value)> {
        let mut data = self.data.clone();
        let mut stamp = |column: &str| {
            data.retain(|(k, _)| k != column);
            data.push((column.to_string(), Value::String(now.to_string())));
        };
        if self.has_updated_at {
            stamp("updated_at");
        }
        if inserting && self.has_created_at {
            stamp("created_at");
        }
        data
    }

    fn insert_sql(&self, now: &str) -> SqlResult {
        let data = self.stamped(now, true);
        let columns: Vec<String> = data.iter().map(|(k, _)| quote_identifier(k)).collect();
        let placeholders = vec!["?"; data.len()].join(", ");
        SqlResult {
            query: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(&self.table),
                columns.join(", "),
                placeholders
            ),
            params: data.into_iter().map(|(_, v)| v).collect(),
        }
    }

    fn update_sql(&self, now: &str) -> SqlResult {
        let data = self.stamped(now, false);
        let assignments: Vec<String> = data.iter().map(|(k, _)| format!("{} = ?", quote_identifier(k))).collect();
        let predicates: Vec<String> = self
            .lookup
            .iter()
            .map(|c| format!("{} = ?", quote_identifier(&c.field)))
            .collect();

        let mut params: Vec<Value> = data.into_iter().map(|(_, v)| v).collect();
        params.extend(self.lookup.iter().map(|c| c.value.clone()));

        SqlResult {
            query: format!(
                "UPDATE {} SET {} WHERE {}",
                quote_identifier(&self.table),
                assignments.join(", "),
                predicates.join(" AND ")
            ),
            params,
        }
    }
}

fn parse_unique_by(raw: Option<Value>) -> Result<Vec<String>, DatabaseError> {
    let invalid = || DatabaseError::Validation("unique_by must be an array of column names".to_string());
    let items = match raw {
        None | Some(Value::Null) => return Ok(vec![UpsertPlan::DEFAULT_UNIQUE_FIELD.to_string()]),
        Some(Value::String(s)) => serde_json::from_str::<Vec<Value>>(&s).map_err(|_| invalid())?,
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid()),
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::String(s) if !s.is_empty() => Ok(s),
            _ => Err(invalid()),
        })
        .collect()
}

/// Common primary key spellings, checked in order of preference
pub fn guess_primary_key(table: &str, columns: &[String]) -> String {
    let table_id = format!("{}_id", table);
    let found = ["id", "ID", "pk_id", "primary_id", table_id.as_str()]
        .into_iter()
        .find(|candidate| columns.iter().any(|c| c == candidate))
        .unwrap_or(UpsertPlan::DEFAULT_UNIQUE_FIELD)
        .to_string();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn default_unique_by_is_id() {
        let plan = UpsertPlan::prepare(
            "training",
            payload(json!({ "ID": 5, "title": "Rust", "bogus": 1, "notes": null })),
            &columns(&["ID", "title", "notes"]),
            None,
        )
        .unwrap();

        assert_eq!(plan.lookup, vec![Condition::new("ID", FilterOp::Eq, json!(5))]);
        assert_eq!(plan.data(), &[("ID".to_string(), json!(5)), ("title".to_string(), json!("Rust"))]);
        assert_eq!(plan.primary_key, "ID");
    }

    #[test]
    fn unique_by_as_json_string() {
        let plan = UpsertPlan::prepare(
            "trainer_schedule",
            payload(json!({ "unique_by": "[\"trainerID\",\"day\"]", "trainerID": 3, "day": "mon", "slot": 2 })),
            &columns(&["ID", "trainerID", "day", "slot"]),
            None,
        )
        .unwrap();
        let fields: Vec<&str> = plan.lookup.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["trainerID", "day"]);
        assert!(plan.data().iter().all(|(k, _)| k != "unique_by"));
    }

    #[test]
    fn unknown_unique_field_is_rejected() {
        let err = UpsertPlan::prepare(
            "training",
            payload(json!({ "unique_by": ["code"], "title": "x" })),
            &columns(&["ID", "title"]),
            None,
        )
        .unwrap_err();
        match err {
            DatabaseError::Validation(msg) => {
                assert!(msg.contains("'code'"));
                assert!(msg.contains("ID, title"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn malformed_unique_by_is_rejected() {
        for bad in [json!("not json"), json!(42), json!([1, 2])] {
            let result = UpsertPlan::prepare(
                "training",
                payload(json!({ "unique_by": bad, "title": "x" })),
                &columns(&["ID", "title"]),
                None,
            );
            assert!(matches!(result, Err(DatabaseError::Validation(_))));
        }
    }

    #[test]
    fn empty_clean_data_is_rejected() {
        let result = UpsertPlan::prepare("training", payload(json!({ "nope": 1, "title": null })), &columns(&["ID", "title"]), None);
        assert!(matches!(result, Err(DatabaseError::Validation(msg)) if msg == "No valid data provided"));
    }

    #[test]
    fn missing_unique_values_mean_insert() {
        let plan = UpsertPlan::prepare("training", payload(json!({ "title": "x" })), &columns(&["ID", "title"]), None).unwrap();
        assert!(plan.lookup_sql().unwrap().is_none());
    }

    #[test]
    fn insert_and_update_sql_with_timestamps() {
        let plan = UpsertPlan::prepare(
            "training",
            payload(json!({ "ID": 9, "title": "Rust", "updated_at": "client" })),
            &columns(&["ID", "title", "created_at", "updated_at"]),
            Some("ID".to_string()),
        )
        .unwrap();

        let insert = plan.insert_sql("2025-01-01 00:00:00");
        assert_eq!(
            insert.query,
            "INSERT INTO `training` (`ID`, `title`, `updated_at`, `created_at`) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(
            insert.params,
            vec![json!(9), json!("Rust"), json!("2025-01-01 00:00:00"), json!("2025-01-01 00:00:00")]
        );

        let update = plan.update_sql("2025-01-01 00:00:00");
        assert_eq!(
            update.query,
            "UPDATE `training` SET `ID` = ?, `title` = ?, `updated_at` = ? WHERE `ID` = ?"
        );
        assert_eq!(update.params, vec![json!(9), json!("Rust"), json!("2025-01-01 00:00:00"), json!(9)]);
    }

    #[test]
    fn reload_uses_primary_key_then_lookup() {
        let plan = UpsertPlan::prepare("training", payload(json!({ "ID": 2, "title": "x" })), &columns(&["ID", "title"]), None).unwrap();
        let by_id = plan.reload_sql(41).unwrap().unwrap();
        assert_eq!(by_id.query, "SELECT * FROM `training` WHERE `ID` = ? LIMIT 1 OFFSET 0");
        assert_eq!(by_id.params, vec![json!(41)]);

        let by_lookup = plan.reload_sql(0).unwrap().unwrap();
        assert_eq!(by_lookup.params, vec![json!(2)]);
    }

    #[test]
    fn primary_key_guesses() {
        assert_eq!(guess_primary_key("t", &columns(&["name", "id"])), "id");
        assert_eq!(guess_primary_key("t", &columns(&["ID", "name"])), "ID");
        assert_eq!(guess_primary_key("feedback", &columns(&["feedback_id", "x"])), "feedback_id");
        assert_eq!(guess_primary_key("t", &columns(&["code"])), "ID");
    }

    #[test]
    fn table_id_column_is_the_last_resort() {
        let cols = columns(&["course_id", "title"]);
        assert_eq!(guess_primary_key("course", &cols), "course_id");
        assert_eq!(guess_primary_key("lesson", &cols), "ID");

        let both = columns(&["course_id", "pk_id"]);
        assert_eq!(guess_primary_key("course", &both), "pk_id");
    }
}
