//! Field value types used by filters and row comparison

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether ordering comparisons (`<`, `>`, ...) make sense for this value
    pub fn is_ordered(&self) -> bool {
        !matches!(self, FieldValue::Boolean(_) | FieldValue::Null)
    }

    /// Build a value from a JSON scalar.
    ///
    /// RFC 3339 strings become `DateTime` so they order as instants rather
    /// than as text. Arrays and objects have no field-value counterpart and
    /// return `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Integer(i)),
                None => n.as_f64().map(FieldValue::Float),
            },
            Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                Ok(at) => Some(FieldValue::DateTime(at.with_timezone(&Utc))),
                Err(_) => Some(FieldValue::String(s.clone())),
            },
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Compare a stored JSON value against this value.
    ///
    /// Returns `None` when the two are not comparable (type mismatch, or a
    /// null on only one side).
    pub fn compare_to_json(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (FieldValue::Null, Value::Null) => Some(Ordering::Equal),
            (FieldValue::Null, _) | (_, Value::Null) => None,
            (FieldValue::Integer(expected), stored) => match stored.as_i64() {
                Some(actual) => Some(actual.cmp(expected)),
                None => stored.as_f64()?.partial_cmp(&(*expected as f64)),
            },
            (FieldValue::Float(expected), stored) => stored.as_f64()?.partial_cmp(expected),
            (FieldValue::Boolean(expected), stored) => Some(stored.as_bool()?.cmp(expected)),
            (FieldValue::String(expected), stored) => Some(stored.as_str()?.cmp(expected.as_str())),
            (FieldValue::DateTime(expected), stored) => {
                let actual = DateTime::parse_from_rfc3339(stored.as_str()?).ok()?;
                Some(actual.with_timezone(&Utc).cmp(expected))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
