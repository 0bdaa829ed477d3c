//! Query execution against the managed connection.
//!
//! The executor runs statements the validator has already admitted. It
//! requires the connection manager to be ready, times the driver call, and
//! folds success and failure into the same envelope. A single attempt per
//! statement; failures are never retried here.

use std::time::Instant;

use crate::connection::ConnectionManager;
use crate::db::ParamValue;
use crate::query::ExecutionReport;
use crate::safety::OperationKind;

/// Executes admitted statements and normalizes their results.
pub struct QueryExecutor<'a> {
    connections: &'a ConnectionManager,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor borrowing the connection manager.
    pub fn new(connections: &'a ConnectionManager) -> Self {
        Self { connections }
    }

    /// Executes one statement with positional parameter binding.
    ///
    /// `operation` is the kind the validator classified; it must not be
    /// `Unknown`. The pooled connection is borrowed for exactly this call
    /// and released on every exit path by the client.
    pub async fn run(
        &self,
        sql: &str,
        params: &[ParamValue],
        operation: OperationKind,
    ) -> ExecutionReport {
        let client = match self.connections.client() {
            Ok(client) => client,
            // Pool uninitialized or closed: fail without any contact attempt.
            Err(e) => return ExecutionReport::failure(operation, &e, 0),
        };

        let start = Instant::now();
        let result = client.execute_query(sql, params, operation).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => ExecutionReport::success(operation, output, elapsed_ms),
            Err(e) => ExecutionReport::failure(operation, &e, elapsed_ms),
        }
    }
}
