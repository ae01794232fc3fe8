//! Connection trait

use crate::{QueryResult, Result, SchemaIntrospection, StatementResult, Value};
use async_trait::async_trait;

/// An open connection to one storage engine
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "mssql", "oledb")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a query, skipping rows that fail to convert.
    ///
    /// Skipped rows are described in `QueryResult::warnings`. Only failures that
    /// prevent the statement from running at all are returned as errors.
    async fn query_lenient(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.query(sql, params).await
    }

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}
