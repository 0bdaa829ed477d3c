//! Statement execution and the normalized result envelope.

mod executor;

pub use executor::QueryExecutor;

use serde::{Deserialize, Serialize};

use crate::db::{FieldInfo, QueryOutput, Row};
use crate::error::GatekeeperError;
use crate::safety::OperationKind;

/// Structured failure inside an execution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// The driver's message, verbatim.
    pub message: String,

    /// Driver-specific error code, when available.
    pub code: Option<String>,
}

/// The normalized envelope returned for every executed statement.
///
/// Success and failure share the same shape; the envelope is created per
/// call, rendered to the caller, and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Whether the statement executed without a driver error.
    pub success: bool,

    /// The operation kind classified at validation time.
    pub operation: OperationKind,

    /// Field descriptors in column order (reads only).
    pub columns: Vec<FieldInfo>,

    /// Result rows (reads only).
    pub rows: Vec<Row>,

    /// Rows modified by a write.
    pub affected_rows: u64,

    /// Generated identifier for inserts.
    pub last_insert_id: Option<u64>,

    /// Whether the result set was cut off at the row cap.
    pub was_truncated: bool,

    /// Wall-clock execution time in milliseconds.
    pub elapsed_ms: u64,

    /// Failure details, present when `success` is false.
    pub error: Option<ExecutionError>,
}

impl ExecutionReport {
    /// Builds a success report from driver output.
    pub fn success(operation: OperationKind, output: QueryOutput, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            operation,
            columns: output.columns,
            rows: output.rows,
            affected_rows: output.affected_rows,
            last_insert_id: output.last_insert_id,
            was_truncated: output.was_truncated,
            elapsed_ms,
            error: None,
        }
    }

    /// Builds a failure report from an error, preserving the driver code
    /// when there is one.
    pub fn failure(operation: OperationKind, error: &GatekeeperError, elapsed_ms: u64) -> Self {
        let error = match error {
            GatekeeperError::Query { message, code } => ExecutionError {
                message: message.clone(),
                code: code.clone(),
            },
            other => ExecutionError {
                message: other.to_string(),
                code: None,
            },
        };

        Self {
            success: false,
            operation,
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            last_insert_id: None,
            was_truncated: false,
            elapsed_ms,
            error: Some(error),
        }
    }

    /// Returns the number of result rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders the rows as a JSON array of name-to-value objects.
    pub fn rows_as_json(&self) -> serde_json::Value {
        let objects: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let map: serde_json::Map<String, serde_json::Value> = row
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let name = self
                            .columns
                            .get(i)
                            .map(|c| c.name.clone())
                            .unwrap_or_else(|| format!("column_{i}"));
                        (name, value.to_json())
                    })
                    .collect();
                serde_json::Value::Object(map)
            })
            .collect();

        serde_json::Value::Array(objects)
    }
}
