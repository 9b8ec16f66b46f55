//! Wire-string to typed value conversion.
//!
//! The table is fixed for wire compatibility:
//!
//! | kind        | empty token          | otherwise                                 |
//! |-------------|----------------------|-------------------------------------------|
//! | string      | `""`                 | unchanged                                 |
//! | int16/32/64 | `0`                  | invariant parse, range checked            |
//! | decimal/fp  | `0`                  | invariant parse                           |
//! | boolean     | `false`              | `true`/`on`/`1`/`yes` (any case), else false |
//! | datetime    | `0001-01-01T00:00:00`| invariant parse                           |
//! | guid        | nil uuid             | strict parse                              |
//! | enum        | error                | member name, case-sensitive               |
//! | nullable    | null                 | `null` (any case) is null, else inner     |
//! | bytes       | `[]`                 | `[]`                                      |
//! | convertible | converter or null    | converter or null                         |

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::contract::ParamKind;
use crate::error::HostError;

const TRUE_TOKENS: [&str; 4] = ["true", "on", "1", "yes"];

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Sentinel decoded from an empty date-time token.
pub fn min_date_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Canonical wire form of a date-time, as serde writes it.
pub fn format_date_time(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Decode one URL token into the JSON value for `kind`.
pub fn decode(text: &str, kind: &ParamKind) -> Result<Value, HostError> {
    match kind {
        ParamKind::String => Ok(Value::String(text.to_string())),
        ParamKind::Int16 => decode_int(text, kind, i16::MIN as i64, i16::MAX as i64),
        ParamKind::Int32 => decode_int(text, kind, i32::MIN as i64, i32::MAX as i64),
        ParamKind::Int64 => decode_int(text, kind, i64::MIN, i64::MAX),
        ParamKind::Decimal | ParamKind::Double => {
            decode_float(text, kind, |t| t.parse::<f64>().ok())
        }
        ParamKind::Float => decode_float(text, kind, |t| t.parse::<f32>().ok().map(f64::from)),
        ParamKind::Boolean => Ok(Value::Bool(
            TRUE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(text)),
        )),
        ParamKind::DateTime => {
            let value = if text.is_empty() {
                min_date_time()
            } else {
                parse_date_time(text.trim()).ok_or_else(|| conversion(text, kind))?
            };
            Ok(Value::String(format_date_time(&value)))
        }
        ParamKind::Guid => {
            let value = if text.is_empty() {
                Uuid::nil()
            } else {
                Uuid::try_parse(text).map_err(|_| conversion(text, kind))?
            };
            Ok(Value::String(value.hyphenated().to_string()))
        }
        ParamKind::Enum(members) => members
            .iter()
            .find(|m| **m == text)
            .map(|m| Value::String(m.to_string()))
            .ok_or_else(|| conversion(text, kind)),
        ParamKind::Nullable(inner) => {
            if text.is_empty() || text.eq_ignore_ascii_case("null") {
                Ok(Value::Null)
            } else {
                decode(text, inner)
            }
        }
        ParamKind::Bytes => Ok(Value::Array(Vec::new())),
        // Unconvertible tokens become null.
        ParamKind::Convertible(converter) => {
            Ok(converter.and_then(|f| f(text)).unwrap_or(Value::Null))
        }
    }
}

/// Wire text of a scalar JSON value, as written into URLs.
pub fn encode(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays and objects are body-only.
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn decode_int(text: &str, kind: &ParamKind, min: i64, max: i64) -> Result<Value, HostError> {
    if text.is_empty() {
        return Ok(Value::from(0));
    }
    match text.trim().parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(Value::from(n)),
        _ => Err(conversion(text, kind)),
    }
}

fn decode_float(
    text: &str,
    kind: &ParamKind,
    parse: impl Fn(&str) -> Option<f64>,
) -> Result<Value, HostError> {
    if text.is_empty() {
        return Ok(Value::from(0));
    }
    parse(text.trim())
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| conversion(text, kind))
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn conversion(text: &str, kind: &ParamKind) -> HostError {
    HostError::ParameterConversion {
        value: text.to_string(),
        target: kind.type_name(),
    }
}
