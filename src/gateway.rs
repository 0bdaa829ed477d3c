//! The gateway surface: the operations exposed to the protocol-framing
//! layer, each returning a renderable text payload plus an error flag.
//!
//! Control flow per execute call: validate the statement, validate the
//! parameters, and only then hand the original statement to the executor.
//! A rejected statement never reaches the connection pool.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::db::{self, DatabaseClient, ParamValue, TableInfo};
use crate::error::Result;
use crate::query::{ExecutionReport, QueryExecutor};
use crate::safety::SqlValidator;

/// A rendered response for the framing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    /// Human-readable payload.
    pub text: String,

    /// True for validation rejections and execution failures.
    pub is_error: bool,
}

impl ToolResponse {
    /// Creates a success response.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Creates an error response.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// The guarded SQL gateway.
///
/// Owns the safety policy and the connection lifecycle; stateless between
/// calls beyond the pool's live connections.
pub struct Gateway {
    validator: SqlValidator,
    connections: ConnectionManager,
}

impl Gateway {
    /// Creates a gateway with no database connection yet.
    pub fn new() -> Self {
        Self {
            validator: SqlValidator::new(),
            connections: ConnectionManager::new(),
        }
    }

    /// Creates a gateway around an existing client (test injection point).
    pub fn with_client(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            validator: SqlValidator::new(),
            connections: ConnectionManager::with_client(client),
        }
    }

    /// Initializes the connection pool from the configuration.
    pub async fn connect(&mut self, config: &DatabaseConfig) -> Result<()> {
        self.connections.connect(config).await
    }

    /// Shuts the pool down.
    pub async fn close(&mut self) -> Result<()> {
        self.connections.close().await
    }

    /// Validates and executes one SQL statement.
    pub async fn execute_statement(
        &self,
        sql: &str,
        params: Option<&JsonValue>,
    ) -> ToolResponse {
        let verdict = self.validator.validate_statement(sql);
        if !verdict.admissible {
            debug!("Rejected statement: {}", verdict.reason_or_default());
            return ToolResponse::error(format!(
                "SQL validation failed: {}",
                verdict.reason_or_default()
            ));
        }

        let bound_params = match params {
            Some(value) => {
                let param_verdict = self.validator.validate_params(value);
                if !param_verdict.admissible {
                    return ToolResponse::error(format!(
                        "Parameter validation failed: {}",
                        param_verdict.reason_or_default()
                    ));
                }
                match ParamValue::list_from_json(value) {
                    Ok(list) => list,
                    Err(e) => {
                        return ToolResponse::error(format!("Parameter validation failed: {e}"))
                    }
                }
            }
            None => Vec::new(),
        };

        let executor = QueryExecutor::new(&self.connections);
        let report = executor.run(sql, &bound_params, verdict.operation).await;
        render_report(&report)
    }

    /// Lists every table with its column structure.
    pub async fn tables_info(&self) -> ToolResponse {
        let client = match self.connections.client() {
            Ok(client) => client,
            Err(e) => return ToolResponse::error(format!("Failed to fetch table info: {e}")),
        };

        match db::schema::tables_info(client).await {
            Ok(tables) => ToolResponse::ok(render_tables(&tables)),
            Err(e) => ToolResponse::error(format!("Failed to fetch table info: {e}")),
        }
    }

    /// Reports the connection lifecycle state. Never queries the database.
    pub fn connection_status(&self) -> ToolResponse {
        let status = match self.connections.state() {
            ConnectionState::Ready => "connected".to_string(),
            state => format!("not connected ({state})"),
        };
        ToolResponse::ok(format!("Database connection status: {status}"))
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders an execution report as text.
fn render_report(report: &ExecutionReport) -> ToolResponse {
    if let Some(error) = &report.error {
        let mut text = format!("✗ Statement failed: {}", error.message);
        if let Some(code) = &error.code {
            text.push_str(&format!("\nerror code: {code}"));
        }
        return ToolResponse::error(text);
    }

    let mut text = String::from("✓ Statement executed\n");
    text.push_str(&format!("operation: {}\n", report.operation));
    text.push_str(&format!("elapsed: {}ms\n", report.elapsed_ms));
    text.push_str(&format!("rows affected: {}\n", report.affected_rows));

    if let Some(id) = report.last_insert_id {
        text.push_str(&format!("insert id: {id}\n"));
    }

    if report.operation.is_read() {
        text.push_str(&format!("\nrows ({}):\n", report.row_count()));
        let dump = serde_json::to_string_pretty(&report.rows_as_json())
            .unwrap_or_else(|_| "[]".to_string());
        text.push_str(&dump);
        if report.was_truncated {
            text.push_str("\n(result truncated)");
        }
    }

    ToolResponse::ok(text)
}

/// Renders the introspection aggregate as text.
fn render_tables(tables: &[TableInfo]) -> String {
    let mut text = format!("Tables ({}):\n", tables.len());

    for table in tables {
        text.push_str(&format!("\nTable: {}\n", table.name));
        for column in &table.columns {
            let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
            text.push_str(&format!(
                "  - {} ({}) {}",
                column.field, column.data_type, nullability
            ));
            if !column.key.is_empty() {
                text.push_str(&format!(" {}", column.key));
            }
            if !column.extra.is_empty() {
                text.push_str(&format!(" {}", column.extra));
            }
            text.push('\n');
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FieldInfo, MockDatabaseClient, QueryOutput, Value};
    use serde_json::json;

    #[tokio::test]
    async fn test_execute_statement_renders_select() {
        let output = QueryOutput::rows(
            vec![FieldInfo::new("x", "BIGINT")],
            vec![vec![Value::Int(1)]],
        );
        let gateway = Gateway::with_client(Box::new(MockDatabaseClient::with_output(output)));

        let response = gateway.execute_statement("SELECT 1 AS x", None).await;

        assert!(!response.is_error);
        assert!(response.text.contains("✓ Statement executed"));
        assert!(response.text.contains("operation: select"));
        assert!(response.text.contains("rows affected: 0"));
        assert!(response.text.contains("\"x\": 1"));
    }

    #[tokio::test]
    async fn test_execute_statement_rejects_before_pool() {
        let client = std::sync::Arc::new(MockDatabaseClient::new());
        let gateway = Gateway::with_client(Box::new(client.clone()));

        let response = gateway.execute_statement("DROP TABLE users", None).await;

        assert!(response.is_error);
        assert!(response.text.contains("SQL validation failed"));
        assert!(response.text.contains("drop table"));
        assert_eq!(client.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_statement_rejects_bad_params() {
        let client = std::sync::Arc::new(MockDatabaseClient::new());
        let gateway = Gateway::with_client(Box::new(client.clone()));

        let response = gateway
            .execute_statement("SELECT 1", Some(&json!({"a": 1})))
            .await;

        assert!(response.is_error);
        assert!(response.text.contains("Parameter validation failed"));
        assert_eq!(client.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_renders_generated_id() {
        let gateway = Gateway::with_client(Box::new(MockDatabaseClient::with_output(
            QueryOutput::write(1, Some(42)),
        )));

        let response = gateway
            .execute_statement("INSERT INTO t (v) VALUES (?)", Some(&json!([5])))
            .await;

        assert!(!response.is_error);
        assert!(response.text.contains("rows affected: 1"));
        assert!(response.text.contains("insert id: 42"));
    }

    #[tokio::test]
    async fn test_connection_status_before_init() {
        let gateway = Gateway::new();
        let response = gateway.connection_status();

        assert!(!response.is_error);
        assert!(response.text.contains("not connected"));
    }

    #[tokio::test]
    async fn test_connection_status_when_ready() {
        let gateway = Gateway::with_client(Box::new(MockDatabaseClient::new()));
        let response = gateway.connection_status();

        assert!(response.text.contains("connected"));
        assert!(!response.text.contains("not connected"));
    }

    #[tokio::test]
    async fn test_tables_info_requires_connection() {
        let gateway = Gateway::new();
        let response = gateway.tables_info().await;

        assert!(response.is_error);
        assert!(response.text.contains("Failed to fetch table info"));
    }
}
