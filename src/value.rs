//! Scalar conversion between JSON rows and store values
//!
//! Inbound, a JSON value is checked against its column type and turned into
//! a bindable SQLite value. Outbound, a raw SQLite value is decoded into a
//! `StoreValue` and normalized back into JSON.

use crate::schema::ColumnType;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value as JsonValue};
use std::str::FromStr;

/// One table record: column name to scalar, in insertion order
pub type Row = serde_json::Map<String, JsonValue>;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value as the store holds it, after decoding by column type
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Integer(i64),
    Real(f64),
    Decimal(Decimal),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    TextArray(Vec<String>),
    Json(JsonValue),
    Blob(Vec<u8>),
}

impl StoreValue {
    /// Decode a raw SQLite value read from a column of type `column_type`
    ///
    /// Values that do not match their column's type (a non-numeric string in
    /// a `NUMERIC` column, say) keep their raw representation.
    pub fn decode(raw: ValueRef<'_>, column_type: ColumnType) -> Self {
        let natural = StoreValue::natural(raw);

        match (column_type, natural) {
            (_, StoreValue::Null) => StoreValue::Null,

            (ColumnType::Decimal, StoreValue::Integer(i)) => StoreValue::Decimal(Decimal::from(i)),
            (ColumnType::Decimal, StoreValue::Real(f)) => match Decimal::from_f64(f) {
                Some(d) => StoreValue::Decimal(d),
                None => StoreValue::Real(f),
            },
            (ColumnType::Decimal, StoreValue::Text(s)) => match parse_decimal(&s) {
                Some(d) => StoreValue::Decimal(d),
                None => StoreValue::Text(s),
            },

            (ColumnType::Boolean, StoreValue::Integer(i)) => StoreValue::Boolean(i != 0),
            (ColumnType::Boolean, StoreValue::Text(s)) => match parse_bool(&s) {
                Some(b) => StoreValue::Boolean(b),
                None => StoreValue::Text(s),
            },

            (ColumnType::Timestamp, StoreValue::Text(s)) => match parse_timestamp(&s) {
                Some(t) => StoreValue::Timestamp(t),
                None => StoreValue::Text(s),
            },
            (ColumnType::Date, StoreValue::Text(s)) => {
                match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT) {
                    Ok(d) => StoreValue::Date(d),
                    Err(_) => StoreValue::Text(s),
                }
            }

            (ColumnType::TextArray, StoreValue::Text(s)) => {
                match serde_json::from_str::<JsonValue>(&s) {
                    Ok(JsonValue::Array(items)) => {
                        let strings: Option<Vec<String>> =
                            items.iter().map(|v| v.as_str().map(String::from)).collect();
                        match strings {
                            Some(strings) => StoreValue::TextArray(strings),
                            None => StoreValue::Json(JsonValue::Array(items)),
                        }
                    }
                    _ => StoreValue::Text(s),
                }
            }
            (ColumnType::Json, StoreValue::Text(s)) => match serde_json::from_str(&s) {
                Ok(v) => StoreValue::Json(v),
                Err(_) => StoreValue::Text(s),
            },

            (_, other) => other,
        }
    }

    fn natural(raw: ValueRef<'_>) -> Self {
        match raw {
            ValueRef::Null => StoreValue::Null,
            ValueRef::Integer(i) => StoreValue::Integer(i),
            ValueRef::Real(f) => StoreValue::Real(f),
            ValueRef::Text(bytes) => StoreValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => StoreValue::Blob(bytes.to_vec()),
        }
    }

    /// Convert into a JSON-representable value
    ///
    /// Decimals become floats, temporal values ISO-8601 strings, and anything
    /// JSON cannot hold (blobs, non-finite floats) its canonical string form.
    pub fn normalize(self) -> JsonValue {
        match self {
            StoreValue::Null => JsonValue::Null,
            StoreValue::Integer(i) => JsonValue::from(i),
            StoreValue::Real(f) => float_or_string(f),
            StoreValue::Decimal(d) => match d.to_f64() {
                Some(f) => float_or_string(f),
                None => JsonValue::String(d.to_string()),
            },
            StoreValue::Text(s) => JsonValue::String(s),
            StoreValue::Boolean(b) => JsonValue::Bool(b),
            StoreValue::Timestamp(t) => JsonValue::String(format_timestamp(&t)),
            StoreValue::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
            StoreValue::TextArray(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::String).collect())
            }
            StoreValue::Json(v) => v,
            StoreValue::Blob(bytes) => JsonValue::String(hex::encode(bytes)),
        }
    }
}

/// Convert a JSON row value into a bindable value for a column of `column_type`
///
/// Returns a human-readable reason when the value cannot be stored.
pub fn to_sql_value(value: &JsonValue, column_type: ColumnType) -> Result<SqlValue, String> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    match column_type {
        ColumnType::Integer => match value {
            JsonValue::Number(n) => number_to_integer(n)
                .map(SqlValue::Integer)
                .ok_or_else(|| format!("expected an integer, got {}", n)),
            other => Err(mismatch("an integer", other)),
        },
        ColumnType::Real => match value.as_f64() {
            Some(f) => Ok(SqlValue::Real(f)),
            None => Err(mismatch("a number", value)),
        },
        ColumnType::Decimal => {
            let parsed = match value {
                JsonValue::Number(n) => parse_decimal(&n.to_string()),
                JsonValue::String(s) => parse_decimal(s),
                _ => None,
            };
            parsed
                .map(|d| SqlValue::Text(d.to_string()))
                .ok_or_else(|| mismatch("a decimal", value))
        }
        ColumnType::Text => match value {
            JsonValue::String(s) => Ok(SqlValue::Text(s.clone())),
            JsonValue::Number(n) => Ok(SqlValue::Text(n.to_string())),
            JsonValue::Bool(b) => Ok(SqlValue::Text(b.to_string())),
            other => Err(mismatch("a string", other)),
        },
        ColumnType::Boolean => match value {
            JsonValue::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            JsonValue::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
                Ok(SqlValue::Integer(n.as_i64().unwrap_or_default()))
            }
            other => Err(mismatch("a boolean", other)),
        },
        ColumnType::Timestamp => {
            let t = value
                .as_str()
                .and_then(parse_timestamp)
                .ok_or_else(|| mismatch("an ISO-8601 timestamp", value))?;
            if t.nanosecond() % 1_000 != 0 {
                return Err("timestamp precision finer than microseconds".to_string());
            }
            Ok(SqlValue::Text(format_timestamp(&t)))
        }
        ColumnType::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
            .map(|d| SqlValue::Text(d.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| mismatch("a YYYY-MM-DD date", value)),
        ColumnType::TextArray => match value {
            JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => {
                Ok(SqlValue::Text(value.to_string()))
            }
            other => Err(mismatch("an array of strings", other)),
        },
        ColumnType::Json => Ok(SqlValue::Text(value.to_string())),
        ColumnType::Other => Ok(match value {
            JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            other => return Err(mismatch("a scalar", other)),
        }),
    }
}

/// Parse `19.99`, `-3`, or scientific notation such as `1.5e3`
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Parse a naive timestamp with either `T` or a space between date and time
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Format as ISO-8601, with microseconds only when the value has them
///
/// Sub-microsecond digits are truncated; inbound values carrying them are
/// rejected by `to_sql_value`.
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn number_to_integer(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, which is out of range
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn float_or_string(f: f64) -> JsonValue {
    match Number::from_f64(f) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::String(f.to_string()),
    }
}

fn mismatch(expected: &str, got: &JsonValue) -> String {
    let kind = match got {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    };
    format!("expected {}, got {}", expected, kind)
}
