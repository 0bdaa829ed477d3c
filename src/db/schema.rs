//! Table and column introspection.
//!
//! Built on top of the ordinary execution path: one "list tables" query,
//! then one "describe" query per table. A failed table list fails the whole
//! call; a failed describe skips that table with a warning (best-effort
//! listing).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::{DatabaseClient, QueryOutput, Value};
use crate::error::Result;
use crate::safety::OperationKind;

/// Structure of one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<ColumnDescription>,
}

/// One column as reported by `DESCRIBE`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column name.
    pub field: String,

    /// Declared type (e.g. `varchar(255)`).
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,

    /// Key kind (`PRI`, `UNI`, `MUL`) or empty.
    pub key: String,

    /// Default value expression, if any.
    pub default: Option<String>,

    /// Extra attributes (e.g. `auto_increment`).
    pub extra: String,
}

/// Lists every table with its column structure.
pub async fn tables_info(client: &dyn DatabaseClient) -> Result<Vec<TableInfo>> {
    let listing = client
        .execute_query("SHOW TABLES", &[], OperationKind::Select)
        .await?;

    let mut tables = Vec::with_capacity(listing.rows.len());
    for row in &listing.rows {
        let Some(name) = row.first().map(value_to_text) else {
            continue;
        };

        let describe = client
            .execute_query(&format!("DESCRIBE `{name}`"), &[], OperationKind::Select)
            .await;

        match describe {
            Ok(output) => tables.push(TableInfo {
                columns: parse_describe(&output),
                name,
            }),
            Err(e) => {
                warn!("Skipping table '{}': describe failed: {}", name, e);
            }
        }
    }

    Ok(tables)
}

/// Converts one `DESCRIBE` result into column descriptions.
fn parse_describe(output: &QueryOutput) -> Vec<ColumnDescription> {
    let index_of = |name: &str| {
        output
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    };

    let field_idx = index_of("Field");
    let type_idx = index_of("Type");
    let null_idx = index_of("Null");
    let key_idx = index_of("Key");
    let default_idx = index_of("Default");
    let extra_idx = index_of("Extra");

    let cell = |row: &[Value], idx: Option<usize>| {
        idx.and_then(|i| row.get(i)).map(value_to_text)
    };

    output
        .rows
        .iter()
        .map(|row| {
            let default = match cell(row, default_idx) {
                Some(text) if !text.is_empty() && text != "NULL" => Some(text),
                _ => None,
            };

            ColumnDescription {
                field: cell(row, field_idx).unwrap_or_default(),
                data_type: cell(row, type_idx).unwrap_or_default(),
                nullable: cell(row, null_idx).as_deref() != Some("NO"),
                key: cell(row, key_idx).unwrap_or_default(),
                default,
                extra: cell(row, extra_idx).unwrap_or_default(),
            }
        })
        .collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_display_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FieldInfo, MockDatabaseClient, ParamValue, QueryOutput};
    use crate::error::GatekeeperError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn describe_output(rows: Vec<Vec<&str>>) -> QueryOutput {
        QueryOutput::rows(
            ["Field", "Type", "Null", "Key", "Default", "Extra"]
                .iter()
                .map(|name| FieldInfo::new(*name, "VARCHAR"))
                .collect(),
            rows.into_iter()
                .map(|row| row.into_iter().map(Value::from).collect())
                .collect(),
        )
    }

    /// Client that lists two tables and fails to describe the second.
    struct PartialFailureClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DatabaseClient for PartialFailureClient {
        async fn execute_query(
            &self,
            sql: &str,
            _params: &[ParamValue],
            _operation: OperationKind,
        ) -> crate::error::Result<QueryOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if sql == "SHOW TABLES" {
                return Ok(QueryOutput::rows(
                    vec![FieldInfo::new("Tables_in_test", "VARCHAR")],
                    vec![vec![Value::from("users")], vec![Value::from("broken")]],
                ));
            }
            if sql.contains("`users`") {
                return Ok(describe_output(vec![
                    vec!["id", "int", "NO", "PRI", "", "auto_increment"],
                    vec!["name", "varchar(100)", "YES", "", "", ""],
                ]));
            }
            Err(GatekeeperError::query("table is marked as crashed"))
        }

        async fn ping(&self) -> crate::error::Result<()> {
            Ok(())
        }

        async fn close(&self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_describe_is_skipped() {
        let client = PartialFailureClient {
            calls: AtomicUsize::new(0),
        };

        let tables = tables_info(&client).await.unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[0].columns.len(), 2);
        // One listing query plus one describe per table.
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_describe_parsing() {
        let client = PartialFailureClient {
            calls: AtomicUsize::new(0),
        };

        let tables = tables_info(&client).await.unwrap();
        let id = &tables[0].columns[0];

        assert_eq!(id.field, "id");
        assert_eq!(id.data_type, "int");
        assert!(!id.nullable);
        assert_eq!(id.key, "PRI");
        assert!(id.default.is_none());
        assert_eq!(id.extra, "auto_increment");

        let name = &tables[0].columns[1];
        assert!(name.nullable);
        assert_eq!(name.key, "");
    }

    #[tokio::test]
    async fn test_failed_listing_fails_the_call() {
        struct ListingFails;

        #[async_trait]
        impl DatabaseClient for ListingFails {
            async fn execute_query(
                &self,
                _sql: &str,
                _params: &[ParamValue],
                _operation: OperationKind,
            ) -> crate::error::Result<QueryOutput> {
                Err(GatekeeperError::query("server has gone away"))
            }

            async fn ping(&self) -> crate::error::Result<()> {
                Ok(())
            }

            async fn close(&self) -> crate::error::Result<()> {
                Ok(())
            }
        }

        let result = tables_info(&ListingFails).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_client_listing_is_empty_friendly() {
        // The default mock returns a single synthetic row for selects; the
        // aggregate should still come back without error.
        let client = MockDatabaseClient::new();
        let tables = tables_info(&client).await.unwrap();
        assert_eq!(tables.len(), 1);
    }
}
