//! Read-only connection over a staged flat file

use async_trait::async_trait;
use budex_core::{
    BudexError, Connection, FileFormat, PrimaryKeyInfo, QueryResult, Result, SchemaIntrospection,
    StatementResult, TableInfo, Value,
};
use budex_driver_sqlite::SqliteConnection;
use std::path::{Path, PathBuf};

use crate::staging::StagedTable;

/// A flat file loaded into a private in-memory SQLite database
pub struct FileConnection {
    inner: SqliteConnection,
    path: PathBuf,
    format: FileFormat,
    table: String,
    /// Records skipped while staging
    staging_warnings: Vec<String>,
}

impl FileConnection {
    /// Load `staged` as `table` into a fresh in-memory database
    pub fn load(path: &Path, format: FileFormat, table: &str, staged: StagedTable) -> Result<Self> {
        let inner = SqliteConnection::open_in_memory()?;
        inner.execute_batch(&staged.create_sql(table))?;
        let loaded = inner.load_rows(table, &staged.column_names(), &staged.rows)?;

        tracing::info!(
            path = %path.display(),
            format = %format,
            table = %table,
            rows = loaded,
            skipped = staged.warnings.len(),
            "flat file staged"
        );
        Ok(Self {
            inner,
            path: path.to_path_buf(),
            format,
            table: table.to_string(),
            staging_warnings: staged.warnings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn staging_warnings(&self) -> &[String] {
        &self.staging_warnings
    }
}

#[async_trait]
impl Connection for FileConnection {
    fn driver_name(&self) -> &str {
        "oledb"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Err(BudexError::NotSupported(format!(
            "{} is staged read-only; modifying statements are not supported",
            self.path.display()
        )))
    }

    #[tracing::instrument(skip(self, sql, params), fields(table = %self.table))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.inner.query(sql, params).await
    }

    #[tracing::instrument(skip(self, sql, params), fields(table = %self.table))]
    async fn query_lenient(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let mut result = self.inner.query_lenient(sql, params).await?;
        result
            .warnings
            .extend(self.staging_warnings.iter().cloned());
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for FileConnection {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        Ok(vec![TableInfo {
            schema: None,
            name: self.table.clone(),
        }])
    }

    /// Flat files carry no keys
    async fn get_primary_key(&self, _table: &str) -> Result<Option<PrimaryKeyInfo>> {
        Ok(None)
    }
}
