//! Database abstraction layer.
//!
//! Provides a trait-based interface over the actual driver so the executor
//! and gateway can be tested against in-memory doubles.

mod mock;
mod mysql;
pub mod schema;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use schema::{ColumnDescription, TableInfo};
pub use types::{FieldInfo, ParamValue, QueryOutput, Row, Value};

use crate::error::Result;
use crate::safety::OperationKind;
use async_trait::async_trait;

/// Interface for executing validated statements against a database.
///
/// One call borrows one pooled connection and returns it on every exit
/// path; implementations never hold a connection across calls or share one
/// between tasks.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a single statement with positional parameter binding.
    ///
    /// `operation` is the kind already classified by the validator; reads
    /// produce rows plus field descriptors, writes produce an affected-row
    /// count and, for inserts, the generated id.
    async fn execute_query(
        &self,
        sql: &str,
        params: &[ParamValue],
        operation: OperationKind,
    ) -> Result<QueryOutput>;

    /// Verifies the connection is alive.
    async fn ping(&self) -> Result<()>;

    /// Closes the underlying pool.
    async fn close(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn DatabaseClient + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DatabaseClient")
    }
}

// Shared handles delegate, so a test can keep a counting reference to a
// client it has handed to the connection manager.
#[async_trait]
impl<T: DatabaseClient + ?Sized> DatabaseClient for std::sync::Arc<T> {
    async fn execute_query(
        &self,
        sql: &str,
        params: &[ParamValue],
        operation: OperationKind,
    ) -> Result<QueryOutput> {
        (**self).execute_query(sql, params, operation).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
