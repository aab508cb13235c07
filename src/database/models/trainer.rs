use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;

use crate::database::manager::DatabaseError;
use crate::database::query_builder;
use crate::database::row::{get_datetime, get_flag, get_i64, get_str, DATETIME_FORMAT};
use crate::filter::SqlResult;

pub const TRAINERS_TABLE: &str = "trainers";
pub const STAGING_TABLE: &str = "trainers_staging";

/// Columns that never leave the service
pub const HIDDEN_FIELDS: [&str; 11] = [
    "password",
    "remember_token",
    "invalid_count",
    "is_locked",
    "locked_time",
    "last_login",
    "last_ip",
    "created_by",
    "created_on",
    "updated_by",
    "updated_on",
];

pub const ROLE_FIELDS: [&str; 4] = ["admin", "manager", "supervisor", "trainer"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub admin: bool,
    pub manager: bool,
    pub supervisor: bool,
    pub trainer: bool,
}

/// A row of `trainers` with the fields the auth flows need pulled out
#[derive(Debug, Clone)]
pub struct TrainerAccount {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub status: bool,
    pub with_2fa: bool,
    pub is_locked: bool,
    pub invalid_count: i64,
    pub locked_time: Option<NaiveDateTime>,
    pub roles: RoleFlags,
    record: Map<String, Value>,
}

impl TrainerAccount {
    pub fn from_record(record: Map<String, Value>) -> Result<Self, DatabaseError> {
        let id = get_i64(&record, "ID").ok_or_else(|| DatabaseError::QueryError("trainer row without ID".to_string()))?;
        Ok(Self {
            id,
            email: get_str(&record, "email").unwrap_or_default(),
            password_hash: get_str(&record, "password").unwrap_or_default(),
            status: get_flag(&record, "status"),
            with_2fa: get_flag(&record, "with_2fa"),
            is_locked: get_flag(&record, "is_locked"),
            invalid_count: get_i64(&record, "invalid_count").unwrap_or(0),
            locked_time: get_datetime(&record, "locked_time"),
            roles: RoleFlags {
                admin: get_flag(&record, "admin"),
                manager: get_flag(&record, "manager"),
                supervisor: get_flag(&record, "supervisor"),
                trainer: get_flag(&record, "trainer"),
            },
            record,
        })
    }

    /// The row minus hidden fields
    pub fn public_record(&self) -> Map<String, Value> {
        strip(&self.record, &HIDDEN_FIELDS)
    }

    /// Public row with the role flags folded into a single `role`
    pub fn session_record(&self, role: &str) -> Map<String, Value> {
        let mut record = strip(&self.public_record(), &ROLE_FIELDS);
        record.insert("role".to_string(), Value::String(role.to_string()));
        record
    }
}

fn strip(record: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    record
        .iter()
        .filter(|(k, _)| !fields.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Queries against `trainers` and `trainers_staging`
#[derive(Clone, Debug)]
pub struct TrainerStore {
    pool: MySqlPool,
}

impl TrainerStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<TrainerAccount>, DatabaseError> {
        self.find_one("SELECT * FROM `trainers` WHERE `email` = ? LIMIT 1", vec![Value::from(email)])
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TrainerAccount>, DatabaseError> {
        self.find_one("SELECT * FROM `trainers` WHERE `ID` = ? LIMIT 1", vec![Value::from(id)])
            .await
    }

    pub async fn find_by_id_and_email(&self, id: i64, email: &str) -> Result<Option<TrainerAccount>, DatabaseError> {
        self.find_one(
            "SELECT * FROM `trainers` WHERE `ID` = ? AND `email` = ? LIMIT 1",
            vec![Value::from(id), Value::from(email)],
        )
        .await
    }

    /// Persist a failed attempt; `locked_at` set means the account is now locked
    pub async fn record_failed_attempt(
        &self,
        id: i64,
        invalid_count: i64,
        locked_at: Option<NaiveDateTime>,
    ) -> Result<(), DatabaseError> {
        let locked_time = locked_at.map(|t| Value::String(t.format(DATETIME_FORMAT).to_string()));
        self.execute(
            "UPDATE `trainers` SET `invalid_count` = ?, `is_locked` = ?, `locked_time` = COALESCE(?, `locked_time`) WHERE `ID` = ?",
            vec![
                Value::from(invalid_count),
                Value::from(locked_at.is_some() as i64),
                locked_time.unwrap_or(Value::Null),
                Value::from(id),
            ],
        )
        .await
    }

    pub async fn clear_lock(&self, id: i64) -> Result<(), DatabaseError> {
        self.execute(
            "UPDATE `trainers` SET `is_locked` = 0, `invalid_count` = 0, `locked_time` = NULL WHERE `ID` = ?",
            vec![Value::from(id)],
        )
        .await
    }

    pub async fn record_login(&self, id: i64, at: NaiveDateTime, ip: Option<&str>) -> Result<(), DatabaseError> {
        self.execute(
            "UPDATE `trainers` SET `is_locked` = 0, `invalid_count` = 0, `locked_time` = NULL, \
             `last_login` = ?, `last_ip` = ? WHERE `ID` = ?",
            vec![
                Value::String(at.format(DATETIME_FORMAT).to_string()),
                ip.map(Value::from).unwrap_or(Value::Null),
                Value::from(id),
            ],
        )
        .await
    }

    /// Replace the password hash; `updated_by` also stamps the audit columns
    pub async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_by: Option<(i64, NaiveDateTime)>,
    ) -> Result<(), DatabaseError> {
        match updated_by {
            Some((by, at)) => {
                self.execute(
                    "UPDATE `trainers` SET `password` = ?, `updated_on` = ?, `updated_by` = ? WHERE `ID` = ?",
                    vec![
                        Value::from(password_hash),
                        Value::String(at.format(DATETIME_FORMAT).to_string()),
                        Value::from(by),
                        Value::from(id),
                    ],
                )
                .await
            }
            None => {
                self.execute(
                    "UPDATE `trainers` SET `password` = ? WHERE `ID` = ?",
                    vec![Value::from(password_hash), Value::from(id)],
                )
                .await
            }
        }
    }

    pub async fn staging_by_employee_no(&self, employee_no: &str) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let sql = SqlResult {
            query: "SELECT * FROM `trainers_staging` WHERE `employeeNo` = ? LIMIT 1".to_string(),
            params: vec![Value::from(employee_no)],
        };
        query_builder::select_optional(&self.pool, &sql).await
    }

    /// True when a trainer already holds this employee number or email
    pub async fn is_registered(&self, employee_no: &Value, email: &Value) -> Result<bool, DatabaseError> {
        let sql = SqlResult {
            query: "SELECT COUNT(*) AS count FROM `trainers` WHERE `employeeNo` = ? OR `email` = ?".to_string(),
            params: vec![employee_no.clone(), email.clone()],
        };
        Ok(query_builder::count(&self.pool, &sql).await? > 0)
    }

    async fn find_one(&self, query: &str, params: Vec<Value>) -> Result<Option<TrainerAccount>, DatabaseError> {
        let sql = SqlResult { query: query.to_string(), params };
        query_builder::select_optional(&self.pool, &sql)
            .await?
            .map(TrainerAccount::from_record)
            .transpose()
    }

    async fn execute(&self, query: &str, params: Vec<Value>) -> Result<(), DatabaseError> {
        let sql = SqlResult { query: query.to_string(), params };
        query_builder::execute(&self.pool, &sql).await?;
        Ok(())
    }
}
