use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;

use crate::database::manager::DatabaseError;
use crate::database::query_builder;
use crate::database::row::{get_datetime, get_i64, get_str, DATETIME_FORMAT};
use crate::filter::SqlResult;

pub const SECRET_FIELD: &str = "two_factor_secret";

/// A row of `two_factor_auth`: the device a user last verified from
#[derive(Debug, Clone)]
pub struct TwoFactorRecord {
    pub id: i64,
    pub user_id: i64,
    pub uuid: Option<String>,
    pub user_agent: Option<String>,
    pub secret_hash: Option<String>,
    pub token_timestamp: Option<NaiveDateTime>,
    record: Map<String, Value>,
}

impl TwoFactorRecord {
    pub fn from_record(record: Map<String, Value>) -> Result<Self, DatabaseError> {
        let id = get_i64(&record, "ID")
            .ok_or_else(|| DatabaseError::QueryError("two_factor_auth row without ID".to_string()))?;
        Ok(Self {
            id,
            user_id: get_i64(&record, "userID").unwrap_or_default(),
            uuid: get_str(&record, "uuid"),
            user_agent: get_str(&record, "user_agent"),
            secret_hash: get_str(&record, SECRET_FIELD).filter(|s| !s.is_empty()),
            token_timestamp: get_datetime(&record, "token_timestamp"),
            record,
        })
    }

    /// True when the request comes from the device bound to this record
    pub fn matches_device(&self, uuid: &str, user_agent: &str) -> bool {
        self.uuid.as_deref() == Some(uuid) && self.user_agent.as_deref() == Some(user_agent)
    }

    /// Row without the OTP hash
    pub fn public_record(&self) -> Map<String, Value> {
        let mut record = self.record.clone();
        record.remove(SECRET_FIELD);
        record
    }
}

#[derive(Clone, Debug)]
pub struct TwoFactorStore {
    pool: MySqlPool,
}

impl TwoFactorStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<TwoFactorRecord>, DatabaseError> {
        let sql = SqlResult {
            query: "SELECT * FROM `two_factor_auth` WHERE `userID` = ? LIMIT 1".to_string(),
            params: vec![Value::from(user_id)],
        };
        query_builder::select_optional(&self.pool, &sql)
            .await?
            .map(TwoFactorRecord::from_record)
            .transpose()
    }

    /// New record with no device bound yet
    pub async fn create(&self, user_id: i64, now: NaiveDateTime) -> Result<(), DatabaseError> {
        self.execute(
            "INSERT INTO `two_factor_auth` (`userID`, `created_on`, `created_by`) VALUES (?, ?, 'AUTO')",
            vec![Value::from(user_id), stamp(now)],
        )
        .await
    }

    pub async fn store_secret(&self, id: i64, secret_hash: &str, now: NaiveDateTime) -> Result<(), DatabaseError> {
        self.execute(
            "UPDATE `two_factor_auth` SET `two_factor_secret` = ?, `token_timestamp` = ? WHERE `ID` = ?",
            vec![Value::from(secret_hash), stamp(now), Value::from(id)],
        )
        .await
    }

    pub async fn touch_ip(&self, id: i64, ip: Option<&str>) -> Result<(), DatabaseError> {
        self.execute(
            "UPDATE `two_factor_auth` SET `user_ip` = ? WHERE `ID` = ?",
            vec![ip.map(Value::from).unwrap_or(Value::Null), Value::from(id)],
        )
        .await
    }

    pub async fn bind_device(
        &self,
        id: i64,
        uuid: &str,
        user_agent: &str,
        ip: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        self.execute(
            "UPDATE `two_factor_auth` SET `uuid` = ?, `user_agent` = ?, `user_ip` = ?, `updated_on` = ? WHERE `ID` = ?",
            vec![
                Value::from(uuid),
                Value::from(user_agent),
                ip.map(Value::from).unwrap_or(Value::Null),
                stamp(now),
                Value::from(id),
            ],
        )
        .await
    }

    async fn execute(&self, query: &str, params: Vec<Value>) -> Result<(), DatabaseError> {
        let sql = SqlResult { query: query.to_string(), params };
        query_builder::execute(&self.pool, &sql).await?;
        Ok(())
    }
}

fn stamp(at: NaiveDateTime) -> Value {
    Value::String(at.format(DATETIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> TwoFactorRecord {
        let row = json!({
            "ID": 3, "userID": 12, "uuid": "dev-1", "user_agent": "Firefox",
            "user_ip": "10.0.0.2", "two_factor_secret": "$2y$10$otp",
            "token_timestamp": "2025-03-01 10:00:00"
        });
        TwoFactorRecord::from_record(row.as_object().unwrap().clone()).unwrap()
    }

    #[test]
    fn device_match_requires_uuid_and_agent() {
        let record = record();
        assert!(record.matches_device("dev-1", "Firefox"));
        assert!(!record.matches_device("dev-2", "Firefox"));
        assert!(!record.matches_device("dev-1", "Chrome"));
    }

    #[test]
    fn secret_is_never_public() {
        let record = record();
        assert_eq!(record.secret_hash.as_deref(), Some("$2y$10$otp"));
        let public = record.public_record();
        assert!(!public.contains_key(SECRET_FIELD));
        assert_eq!(public["uuid"], json!("dev-1"));
    }

    #[test]
    fn unbound_record_matches_nothing() {
        let row = json!({ "ID": 4, "userID": 1, "uuid": null, "user_agent": null });
        let record = TwoFactorRecord::from_record(row.as_object().unwrap().clone()).unwrap();
        assert!(!record.matches_device("", ""));
        assert!(record.secret_hash.is_none());
    }
}
