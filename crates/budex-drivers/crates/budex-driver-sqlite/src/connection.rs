//! SQLite connection implementation

use async_trait::async_trait;
use budex_core::{
    BudexError, ColumnMeta, Connection, PrimaryKeyInfo, QueryResult, Result, Row,
    SchemaIntrospection, StatementResult, TableInfo, Value,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, config::DbConfig, params_from_iter};
use std::path::Path;

/// SQLite connection wrapper.
///
/// The underlying handle is dropped on `close`, after which every call fails
/// with `InvalidState`.
pub struct SqliteConnection {
    conn: Mutex<Option<RusqliteConnection>>,
    label: String,
}

impl SqliteConnection {
    /// Open an existing SQLite database file
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening SQLite database");
        if !path.exists() {
            return Err(BudexError::Connection(format!(
                "SQLite database does not exist: {}",
                path.display()
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = RusqliteConnection::open_with_flags(path, flags).map_err(|e| {
            BudexError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::configure(conn, path.display().to_string())
    }

    /// Open a database file, creating it (but not its directory) when missing
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(BudexError::Connection(format!(
                    "Parent directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let conn = RusqliteConnection::open(path).map_err(|e| {
            BudexError::Connection(format!(
                "Failed to create SQLite database at '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::configure(conn, path.display().to_string())
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = RusqliteConnection::open_in_memory().map_err(|e| {
            BudexError::Connection(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::configure(conn, ":memory:".to_string())
    }

    fn configure(conn: RusqliteConnection, label: String) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            BudexError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        // A double-quoted unknown identifier must be "no such column", not a string literal
        for config in [DbConfig::SQLITE_DBCONFIG_DQS_DML, DbConfig::SQLITE_DBCONFIG_DQS_DDL] {
            conn.set_db_config(config, false).map_err(|e| {
                BudexError::Connection(format!("Failed to disable double-quoted strings: {}", e))
            })?;
        }

        tracing::debug!(database = %label, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            label,
        })
    }

    /// Run `f` against the open handle
    fn with_conn<T>(&self, f: impl FnOnce(&RusqliteConnection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(BudexError::InvalidState(format!(
                "SQLite connection to {} is closed",
                self.label
            ))),
        }
    }

    /// Execute several `;`-separated statements without parameters
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| BudexError::Query(format!("Failed to execute batch: {}", e)))
        })
    }

    /// Insert many rows in one transaction.
    ///
    /// Every row must have exactly `columns.len()` values.
    pub fn load_rows(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<usize> {
        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            column_list,
            placeholders
        );

        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| BudexError::Query(format!("Failed to begin load: {}", e)))?;
            {
                let mut stmt = tx
                    .prepare(&sql)
                    .map_err(|e| BudexError::Query(format!("Failed to prepare load: {}", e)))?;
                for row in rows {
                    let params = values_to_rusqlite(row);
                    stmt.execute(params_from_iter(params.iter()))
                        .map_err(|e| BudexError::Query(format!("Failed to load row: {}", e)))?;
                }
            }
            tx.commit()
                .map_err(|e| BudexError::Query(format!("Failed to commit load: {}", e)))?;
            Ok(rows.len())
        })
    }

    fn run_query(&self, sql: &str, params: &[Value], lenient: bool) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let rusqlite_params = values_to_rusqlite(params);

        let (columns, rows, warnings) = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| BudexError::Query(format!("Failed to prepare query: {}", e)))?;

            // decl_type comes from the CREATE TABLE statement; expressions have none
            let columns: Vec<ColumnMeta> = stmt
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    ColumnMeta::new(col.name(), col.decl_type().unwrap_or("DYNAMIC"), idx)
                })
                .collect();
            let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

            let mut rows = Vec::new();
            let mut warnings = Vec::new();
            let mut query_rows = stmt
                .query(params_from_iter(rusqlite_params.iter()))
                .map_err(|e| BudexError::Query(format!("Failed to execute query: {}", e)))?;

            let mut row_index = 0usize;
            while let Some(row) = query_rows
                .next()
                .map_err(|e| BudexError::Query(format!("Failed to fetch row: {}", e)))?
            {
                let values: Result<Vec<Value>> =
                    (0..columns.len()).map(|i| rusqlite_to_value(row, i)).collect();
                match values {
                    Ok(values) => rows.push(Row::new(column_names.clone(), values)),
                    Err(e) if lenient => {
                        tracing::warn!(row = row_index, error = %e, "skipping unreadable row");
                        warnings.push(format!("row {}: {}", row_index, e));
                    }
                    Err(e) => return Err(e),
                }
                row_index += 1;
            }

            Ok((columns, rows, warnings))
        })?;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            skipped = warnings.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );
        Ok(QueryResult {
            columns,
            rows,
            affected_rows: 0,
            execution_time_ms,
            warnings,
        })
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let rusqlite_params = values_to_rusqlite(params);
        let rows_affected = self.with_conn(|conn| {
            conn.execute(sql, params_from_iter(rusqlite_params.iter()))
                .map_err(|e| BudexError::Query(format!("Failed to execute statement: {}", e)))
        })?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected as u64,
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.run_query(sql, params, false)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query_lenient(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.run_query(sql, params, true)
    }

    async fn close(&self) -> Result<()> {
        let taken = self.conn.lock().take();
        match taken {
            Some(conn) => {
                tracing::info!(database = %self.label, "closing SQLite connection");
                conn.close().map_err(|(_, e)| {
                    BudexError::Connection(format!("Failed to close SQLite connection: {}", e))
                })
            }
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for SqliteConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let result = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(str::to_string))
            .map(|name| TableInfo {
                schema: Some("main".to_string()),
                name,
            })
            .collect();

        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_primary_key(&self, table: &str) -> Result<Option<PrimaryKeyInfo>> {
        let result = self
            .query(
                "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
                &[Value::String(table.to_string())],
            )
            .await?;

        let columns: Vec<String> = result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(str::to_string))
            .collect();

        if columns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PrimaryKeyInfo {
                name: None,
                columns,
            }))
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int16(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float32(f) => rusqlite::types::Value::Real(*f as f64),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Date(d) => rusqlite::types::Value::Text(d.to_string()),
        Value::Time(t) => rusqlite::types::Value::Text(t.to_string()),
        Value::DateTime(dt) => rusqlite::types::Value::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => rusqlite::types::Value::Text(dt.to_rfc3339()),
        Value::Uuid(u) => rusqlite::types::Value::Text(u.to_string()),
    }
}

/// Convert rusqlite row value to our Value type
pub(crate) fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| BudexError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => {
            // Untyped columns sometimes hold text written as a blob
            match std::str::from_utf8(b) {
                Ok(s) => Value::String(s.to_string()),
                Err(_) => Value::Bytes(b.to_vec()),
            }
        }
    };

    Ok(value)
}
