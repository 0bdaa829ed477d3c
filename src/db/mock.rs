//! Mock database clients for testing.
//!
//! `MockDatabaseClient` returns canned results and counts how many times it
//! was invoked, which lets tests assert that rejected statements never reach
//! the database. `FailingDatabaseClient` fails every call.

use super::{DatabaseClient, FieldInfo, ParamValue, QueryOutput, Value};
use crate::error::{GatekeeperError, Result};
use crate::safety::OperationKind;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    canned: Option<QueryOutput>,
    executions: AtomicUsize,
}

impl MockDatabaseClient {
    /// Creates a new mock client with default canned behavior.
    pub fn new() -> Self {
        Self {
            canned: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// Creates a mock client that returns the given output for every call.
    pub fn with_output(output: QueryOutput) -> Self {
        Self {
            canned: Some(output),
            executions: AtomicUsize::new(0),
        }
    }

    /// Returns how many statements reached this client.
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn default_output(sql: &str, operation: OperationKind) -> QueryOutput {
        match operation {
            OperationKind::Select => QueryOutput::rows(
                vec![FieldInfo::new("result", "TEXT")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            ),
            OperationKind::Insert => QueryOutput::write(1, Some(1)),
            _ => QueryOutput::write(1, None),
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(
        &self,
        sql: &str,
        _params: &[ParamValue],
        operation: OperationKind,
    ) -> Result<QueryOutput> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .canned
            .clone()
            .unwrap_or_else(|| Self::default_output(sql, operation)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock client whose every call fails like the driver rejected it.
pub struct FailingDatabaseClient {
    message: String,
    code: Option<String>,
    executions: AtomicUsize,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given driver message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// Creates a failing client that also reports a driver error code.
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
            executions: AtomicUsize::new(0),
        }
    }

    /// Returns how many statements reached this client.
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(
        &self,
        _sql: &str,
        _params: &[ParamValue],
        _operation: OperationKind,
    ) -> Result<QueryOutput> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        Err(GatekeeperError::Query {
            message: self.message.clone(),
            code: self.code.clone(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Err(GatekeeperError::connection("mock connection is down"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
