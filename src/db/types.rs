//! Value and result types for the database layer.
//!
//! Defines the scalar parameter values bound into statements and the
//! driver-level output shape that the executor normalizes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GatekeeperError, Result};

/// A scalar value bound positionally into a statement.
///
/// Only scalars are bindable; arrays and objects fail conversion. The
/// values themselves are not validated further; the driver's positional
/// binding is what neutralizes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum ParamValue {
    /// NULL bind.
    #[default]
    Null,

    /// Boolean bind.
    Bool(bool),

    /// Signed integer bind.
    Int(i64),

    /// Floating point bind.
    Float(f64),

    /// Text bind.
    Text(String),
}

impl ParamValue {
    /// Converts a JSON value into a bindable scalar.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(GatekeeperError::validation(format!(
                        "parameter value out of range: {n}"
                    )))
                }
            }
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
                GatekeeperError::validation("parameter values must be scalars"),
            ),
        }
    }

    /// Converts a JSON array into a bindable parameter list.
    pub fn list_from_json(params: &serde_json::Value) -> Result<Vec<Self>> {
        let Some(list) = params.as_array() else {
            return Err(GatekeeperError::validation("parameters must be an array"));
        };
        list.iter().map(Self::from_json).collect()
    }
}

/// Represents a single value in a result row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Unsigned integer (MySQL UNSIGNED columns).
    UInt(u64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Converts the value to JSON for row dumps.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// A row of data in column order.
pub type Row = Vec<Value>;

/// Metadata for one column of a result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldInfo {
    /// Column name.
    pub name: String,

    /// Declared column type.
    pub data_type: String,

    /// Declared length, when the driver exposes one.
    pub length: Option<u64>,
}

impl FieldInfo {
    /// Creates a field descriptor with no declared length.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            length: None,
        }
    }

    /// Sets the declared length.
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }
}

/// Driver-level output of one executed statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Column metadata for the result set, in column order.
    pub columns: Vec<FieldInfo>,

    /// Result rows (reads only; empty for writes).
    pub rows: Vec<Row>,

    /// Number of rows modified by a write (0 for reads).
    pub affected_rows: u64,

    /// Generated identifier for inserts, when the driver reports one.
    pub last_insert_id: Option<u64>,

    /// Whether the result set was cut off at the row cap.
    pub was_truncated: bool,
}

impl QueryOutput {
    /// Creates an output for a read result.
    pub fn rows(columns: Vec<FieldInfo>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Creates an output for a write result.
    pub fn write(affected_rows: u64, last_insert_id: Option<u64>) -> Self {
        Self {
            affected_rows,
            last_insert_id,
            ..Self::default()
        }
    }

    /// Returns the number of result rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
