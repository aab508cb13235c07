use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::MySqlPool;
use sqlx::Row;

use crate::database::manager::DatabaseError;
use crate::filter::ColumnWhitelist;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Column/table introspection of the live schema
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Column names in ordinal order; empty when the table does not exist
    async fn column_listing(&self, table: &str) -> Result<Vec<String>, DatabaseError>;

    async fn has_table(&self, table: &str) -> Result<bool, DatabaseError>;

    async fn column_types(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Primary key column, if the table declares one
    async fn primary_key(&self, table: &str) -> Result<Option<String>, DatabaseError>;

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .column_listing(table)
            .await?
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column)))
    }

    async fn whitelist(&self, table: &str) -> Result<ColumnWhitelist, DatabaseError> {
        Ok(ColumnWhitelist::new(self.column_listing(table).await?))
    }
}

/// `information_schema` backed introspection for the connected database
#[derive(Clone, Debug)]
pub struct MySqlSchema {
    pool: MySqlPool,
}

impl MySqlSchema {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaIntrospector for MySqlSchema {
    async fn column_listing(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS name FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DatabaseError::from))
            .collect()
    }

    async fn has_table(&self, table: &str) -> Result<bool, DatabaseError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    async fn column_types(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS name, CAST(DATA_TYPE AS CHAR) AS data_type \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ColumnInfo, DatabaseError> {
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: row.try_get("data_type")?,
                })
            })
            .collect()
    }

    async fn primary_key(&self, table: &str) -> Result<Option<String>, DatabaseError> {
        let row = sqlx::query(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS name FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_KEY = 'PRI' \
             ORDER BY ORDINAL_POSITION LIMIT 1",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("name")?)),
            None => Ok(None),
        }
    }
}

/// Fixed in-memory schema, for tests and offline tooling
#[derive(Clone, Debug, Default)]
pub struct StaticSchema {
    tables: Vec<(String, Vec<ColumnInfo>)>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(name, data_type)| ColumnInfo { name: name.to_string(), data_type: data_type.to_string() })
            .collect();
        self.tables.push((table.to_string(), columns));
        self
    }

    fn table(&self, table: &str) -> Option<&Vec<ColumnInfo>> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, cols)| cols)
    }
}

#[async_trait]
impl SchemaIntrospector for StaticSchema {
    async fn column_listing(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .table(table)
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn has_table(&self, table: &str) -> Result<bool, DatabaseError> {
        Ok(self.table(table).is_some())
    }

    async fn column_types(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        Ok(self.table(table).cloned().unwrap_or_default())
    }

    async fn primary_key(&self, table: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.table(table).and_then(|cols| cols.first()).map(|c| c.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> StaticSchema {
        StaticSchema::new().with_table("trainers", &[("ID", "int"), ("email", "varchar"), ("name", "varchar")])
    }

    #[tokio::test]
    async fn static_schema_lists_columns_in_order() {
        let schema = schema();
        assert_eq!(schema.column_listing("trainers").await.unwrap(), vec!["ID", "email", "name"]);
        assert!(schema.column_listing("missing").await.unwrap().is_empty());
        assert!(schema.has_table("trainers").await.unwrap());
        assert!(!schema.has_table("missing").await.unwrap());
    }

    #[tokio::test]
    async fn has_column_is_case_insensitive() {
        let schema = schema();
        assert!(schema.has_column("trainers", "id").await.unwrap());
        assert!(schema.has_column("trainers", "EMAIL").await.unwrap());
        assert!(!schema.has_column("trainers", "password").await.unwrap());
    }

    #[tokio::test]
    async fn whitelist_from_listing() {
        let whitelist = schema().whitelist("trainers").await.unwrap();
        assert!(whitelist.contains("email"));
        assert!(!whitelist.contains("Email"));
    }
}
