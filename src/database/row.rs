use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::types::{BigDecimal, Json};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::database::manager::DatabaseError;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a dynamically shaped row into a JSON object keyed by column name.
/// Decimals come back as strings and datetimes as `YYYY-mm-dd HH:MM:SS`.
pub fn row_to_json(row: &MySqlRow) -> Result<Map<String, Value>, DatabaseError> {
    let mut map = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let value = if row.try_get_raw(idx)?.is_null() {
            Value::Null
        } else {
            decode_column(row, idx, column.type_info().name())?
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, DatabaseError> {
    let value = match type_name {
        // TINYINT(1) is reported as BOOLEAN; keep it numeric like the rest of the API
        "BOOLEAN" | "TINYINT" => Value::from(row.try_get::<i8, _>(idx)?),
        "SMALLINT" => Value::from(row.try_get::<i16, _>(idx)?),
        "MEDIUMINT" | "INT" => Value::from(row.try_get::<i32, _>(idx)?),
        "BIGINT" => Value::from(row.try_get::<i64, _>(idx)?),
        "TINYINT UNSIGNED" => Value::from(row.try_get::<u8, _>(idx)?),
        "SMALLINT UNSIGNED" | "YEAR" => Value::from(row.try_get::<u16, _>(idx)?),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => Value::from(row.try_get::<u32, _>(idx)?),
        "BIGINT UNSIGNED" => Value::from(row.try_get::<u64, _>(idx)?),
        "FLOAT" => float(row.try_get::<f32, _>(idx)? as f64),
        "DOUBLE" => float(row.try_get::<f64, _>(idx)?),
        "DECIMAL" => Value::String(row.try_get::<BigDecimal, _>(idx)?.to_string()),
        "DATETIME" | "TIMESTAMP" => {
            Value::String(row.try_get::<NaiveDateTime, _>(idx)?.format(DATETIME_FORMAT).to_string())
        }
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.format("%Y-%m-%d").to_string()),
        "TIME" => match row.try_get::<NaiveTime, _>(idx) {
            Ok(t) => Value::String(t.format("%H:%M:%S").to_string()),
            Err(_) => text_or_bytes(row, idx)?,
        },
        "JSON" => row.try_get::<Json<Value>, _>(idx)?.0,
        _ => text_or_bytes(row, idx)?,
    };
    Ok(value)
}

fn text_or_bytes(row: &MySqlRow, idx: usize) -> Result<Value, DatabaseError> {
    match row.try_get::<String, _>(idx) {
        Ok(s) => Ok(Value::String(s)),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(idx)?;
            Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Lenient readers for dynamically decoded rows
pub fn get_i64(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

pub fn get_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Truthy the way a TINYINT flag column is: non-zero numbers, "1"/"true"
pub fn get_flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "TRUE" | "yes"),
        _ => false,
    }
}

pub fn get_datetime(map: &Map<String, Value>, key: &str) -> Option<NaiveDateTime> {
    let raw = get_str(map, key)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_readers() {
        let row = json!({
            "ID": 7, "count": "3", "admin": 1, "manager": "0", "status": true,
            "name": "Ann", "locked_time": "2025-01-02 03:04:05", "bad_time": "yesterday"
        });
        let map = row.as_object().unwrap();

        assert_eq!(get_i64(map, "ID"), Some(7));
        assert_eq!(get_i64(map, "count"), Some(3));
        assert_eq!(get_i64(map, "name"), None);
        assert_eq!(get_str(map, "ID").as_deref(), Some("7"));
        assert!(get_flag(map, "admin"));
        assert!(!get_flag(map, "manager"));
        assert!(get_flag(map, "status"));
        assert!(!get_flag(map, "missing"));
        assert_eq!(
            get_datetime(map, "locked_time"),
            NaiveDate::from_ymd_opt(2025, 1, 2).and_then(|d| d.and_hms_opt(3, 4, 5))
        );
        assert_eq!(get_datetime(map, "bad_time"), None);
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float(f64::NAN), Value::Null);
        assert_eq!(float(1.5), json!(1.5));
    }
}
