use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{ColumnType, CoercionError};

/// Cell value type.
///
/// Custom enum instead of `serde_json::Value` to enable type-aware sorting,
/// cheap rendering and clean delimited export without JSON overhead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Timestamp, normalized to UTC.
    DateTime(DateTime<Utc>),
    /// JSON stored as string for exact round-trip preservation.
    Json(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Text(s) | Value::Json(s) => s.clone(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Display string cut at a character boundary, with "..." appended when cut.
    pub fn as_display_string_truncated(&self, max_len: usize) -> String {
        let full = self.as_display_string();
        if full.chars().count() <= max_len {
            return full;
        }

        let truncated: String = full.chars().take(max_len).collect();
        format!("{}...", truncated)
    }

    /// Text placed in an editor when editing starts on this value.
    pub fn edit_text(&self) -> String {
        match self {
            Value::DateTime(dt) => dt.to_rfc3339(),
            other => other.as_display_string(),
        }
    }

    /// Parses user text into a value of the given column type.
    ///
    /// Empty input is `Null` for every type except text.
    pub fn coerce(input: &str, column_type: ColumnType) -> Result<Value, CoercionError> {
        let trimmed = input.trim();

        if trimmed.is_empty() && column_type != ColumnType::Text {
            return Ok(Value::Null);
        }

        match column_type {
            ColumnType::Text | ColumnType::Enumeration => Ok(Value::Text(input.to_string())),
            ColumnType::Json => Ok(Value::Json(input.to_string())),
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CoercionError::new(input, column_type)),
            ColumnType::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| !f.is_nan())
                .map(Value::Float)
                .ok_or_else(|| CoercionError::new(input, column_type)),
            ColumnType::Boolean => parse_bool(trimmed)
                .map(Value::Bool)
                .ok_or_else(|| CoercionError::new(input, column_type)),
            ColumnType::DateTime => parse_datetime(trimmed)
                .map(Value::DateTime)
                .ok_or_else(|| CoercionError::new(input, column_type)),
        }
    }

    pub fn to_serde_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Json(s) => serde_json::from_str(s)
                .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_display_string())
    }
}

impl Value {
    fn type_order(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Json(_) => 4,
            Value::DateTime(_) => 5,
            Value::Null => 6,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;

        match (self, other) {
            // Nulls last
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Json(a), Json(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),

            // Cross-type numeric promotion
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),

            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl Eq for Value {}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
