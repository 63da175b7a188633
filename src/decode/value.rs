//! Cell decoding by declared data type.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{DecodeError, DecodeResult};
use crate::catalog::DataType;
use crate::result::Number;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn invalid(column: &str, value: &Value) -> DecodeError {
    DecodeError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Whole number carried by `value`, as a number or a numeric string.
fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok().or_else(|| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn fractional(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Decode an aggregate cell. SQL NULL (an aggregate over no rows) is zero.
pub(crate) fn number(value: &Value, data_type: DataType, column: &str) -> DecodeResult<Number> {
    if value.is_null() {
        return Ok(match data_type {
            DataType::Integer => Number::Integer(0),
            DataType::Double => Number::Double(0.0),
            _ => Number::Long(0),
        });
    }
    let decoded = match data_type {
        DataType::Integer => integral(value)
            .and_then(|v| i32::try_from(v).ok())
            .map(Number::Integer),
        DataType::Long => integral(value).map(Number::Long),
        DataType::Double => fractional(value).map(Number::Double),
        DataType::Timestamp => timestamp(value, column)?.map(Number::Long),
        DataType::String | DataType::KeyValue => None,
    };
    decoded.ok_or_else(|| invalid(column, value))
}

/// Decode a timestamp cell to epoch milliseconds. Accepts epoch millis,
/// RFC 3339 strings, and naive `YYYY-MM-DD[ HH:MM:SS[.fff]]` strings read as UTC.
pub(crate) fn timestamp(value: &Value, column: &str) -> DecodeResult<Option<i64>> {
    let millis = match value {
        Value::Null => return Ok(None),
        Value::Number(_) => integral(value),
        Value::String(s) => parse_timestamp(s.trim()),
        _ => None,
    };
    millis.map(Some).ok_or_else(|| invalid(column, value))
}

fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc().timestamp_millis())
}

/// Decode a group key cell. `None` for SQL NULL.
pub(crate) fn key(value: &Value, column: &str) -> DecodeResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(invalid(column, value)),
    }
}
