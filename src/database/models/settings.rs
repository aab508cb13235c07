use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;

use crate::database::manager::DatabaseError;
use crate::database::query_builder;
use crate::database::row::{get_i64, get_str};
use crate::filter::SqlResult;

/// Single-row `app_config` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub max_login_attempts: i64,
    /// Minutes
    pub max_lock_duration: i64,
    /// bcrypt hash of the master password
    pub hash_master: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
            max_lock_duration: 15,
            hash_master: None,
        }
    }
}

impl AppSettings {
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            max_login_attempts: get_i64(record, "max_login_attempts")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_login_attempts),
            max_lock_duration: get_i64(record, "max_lock_duration")
                .filter(|n| *n >= 0)
                .unwrap_or(defaults.max_lock_duration),
            hash_master: get_str(record, "hash_master").filter(|h| !h.is_empty()),
        }
    }

    /// Missing row means defaults
    pub async fn load(pool: &MySqlPool) -> Result<Self, DatabaseError> {
        let sql = SqlResult { query: "SELECT * FROM `app_config` LIMIT 1".to_string(), params: vec![] };
        Ok(query_builder::select_optional(pool, &sql)
            .await?
            .map(|row| Self::from_record(&row))
            .unwrap_or_default())
    }
}
