//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient`
//! trait using sqlx. One statement is executed per pooled checkout; sqlx
//! returns the connection to the pool when the call completes, on success
//! and failure alike.

use crate::config::DatabaseConfig;
use crate::db::{DatabaseClient, FieldInfo, ParamValue, QueryOutput, Row, Value};
use crate::error::{GatekeeperError, Result};
use crate::safety::OperationKind;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySql, MySqlArguments, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Connection, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum rows to return from a single read.
const MAX_ROWS: usize = 1000;

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl MySqlClient {
    /// Connects to the database, building the pool from the configuration.
    ///
    /// Transient failures are retried with exponential backoff; the pool is
    /// verified with a ping before being handed out.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let query_timeout = Duration::from_secs(config.query_timeout_secs);

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = MySqlPoolOptions::new()
                .max_connections(config.pool_size)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    let mut conn = pool
                        .acquire()
                        .await
                        .map_err(|e| map_connection_error(e, config))?;
                    conn.ping()
                        .await
                        .map_err(|e| map_connection_error(e, config))?;
                    drop(conn);

                    debug!("Successfully connected to {}", config.display_string());
                    return Ok(Self {
                        pool,
                        query_timeout,
                    });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(map_connection_error(
            last_error.expect("at least one attempt was made"),
            config,
        ))
    }

    async fn run_read(&self, sql: &str, params: &[ParamValue]) -> Result<QueryOutput> {
        let query = bind_params(sqlx::query(sql), params);

        let result = tokio::time::timeout(self.query_timeout, query.fetch_all(&self.pool))
            .await
            .map_err(|_| {
                GatekeeperError::query(format!(
                    "Statement timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(map_query_error)?;

        // Column metadata comes from the first row if there is one; an
        // empty result set still carries field descriptors, fetched from
        // the prepared statement instead.
        let columns: Vec<FieldInfo> = if let Some(first_row) = result.first() {
            first_row
                .columns()
                .iter()
                .map(|col| FieldInfo::new(col.name(), col.type_info().name()))
                .collect()
        } else {
            self.fetch_column_metadata(sql).await.unwrap_or_default()
        };

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(
                "Statement returned {} rows, truncating to {}",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();

        Ok(QueryOutput {
            columns,
            rows,
            affected_rows: 0,
            last_insert_id: None,
            was_truncated,
        })
    }

    async fn run_write(
        &self,
        sql: &str,
        params: &[ParamValue],
        operation: OperationKind,
    ) -> Result<QueryOutput> {
        let query = bind_params(sqlx::query(sql), params);

        let result = tokio::time::timeout(self.query_timeout, query.execute(&self.pool))
            .await
            .map_err(|_| {
                GatekeeperError::query(format!(
                    "Statement timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(map_query_error)?;

        let last_insert_id = match operation {
            OperationKind::Insert if result.last_insert_id() != 0 => Some(result.last_insert_id()),
            _ => None,
        };

        Ok(QueryOutput::write(result.rows_affected(), last_insert_id))
    }

    /// Fetches column metadata for a read that returned no rows, by
    /// preparing the statement without executing it. Best effort: a
    /// failure here yields an empty descriptor list.
    async fn fetch_column_metadata(&self, sql: &str) -> Result<Vec<FieldInfo>> {
        let statement = self.pool.prepare(sql).await.map_err(map_query_error)?;

        Ok(statement
            .columns()
            .iter()
            .map(|col| FieldInfo::new(col.name(), col.type_info().name()))
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute_query(
        &self,
        sql: &str,
        params: &[ParamValue],
        operation: OperationKind,
    ) -> Result<QueryOutput> {
        if operation.is_read() {
            self.run_read(sql, params).await
        } else {
            self.run_write(sql, params, operation).await
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| GatekeeperError::connection(e.to_string()))?;
        conn.ping()
            .await
            .map_err(|e| GatekeeperError::connection(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Binds parameter values positionally onto a query.
fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [ParamValue],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            ParamValue::Null => query.bind(None::<String>),
            ParamValue::Bool(b) => query.bind(*b),
            ParamValue::Int(i) => query.bind(*i),
            ParamValue::Float(f) => query.bind(*f),
            ParamValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
///
/// Decoding is driven by the driver's type name with a string fallback;
/// anything undecodable becomes NULL.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(Value::UInt)
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // VARCHAR, CHAR, TEXT, DECIMAL, ENUM, SET, JSON and everything else.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Determines if a connection error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
    {
        return true;
    }

    // Authentication and unknown-database errors are not transient.
    if error_str.contains("access denied")
        || error_str.contains("unknown database")
        || error_str.contains("ssl")
        || error_str.contains("tls")
    {
        return false;
    }

    false
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &DatabaseConfig) -> GatekeeperError {
    let host = &config.host;
    let port = config.port;
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        GatekeeperError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        GatekeeperError::connection(format!(
            "Access denied for user '{}'. Check your credentials.",
            config.user
        ))
    } else if error_str.contains("unknown database") {
        GatekeeperError::connection(format!("Database '{}' does not exist.", config.database))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        GatekeeperError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        GatekeeperError::connection(error.to_string())
    }
}

/// Maps sqlx statement errors into a query error that preserves the
/// driver's message and error code.
fn map_query_error(error: sqlx::Error) -> GatekeeperError {
    if let Some(db_error) = error.as_database_error() {
        let code = db_error
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|e| e.number().to_string())
            .or_else(|| db_error.code().map(|c| c.into_owned()));

        GatekeeperError::Query {
            message: db_error.message().to_string(),
            code,
        }
    } else {
        GatekeeperError::query(error.to_string())
    }
}
