//! MS SQL Server schema introspection implementation

use async_trait::async_trait;
use budex_core::{Connection, PrimaryKeyInfo, Result, SchemaIntrospection, TableInfo, Value};

use super::MssqlConnection;

const PRIMARY_KEY_QUERY: &str = "SELECT kcu.COLUMN_NAME, tc.CONSTRAINT_NAME
     FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
     JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
       ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
      AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA
      AND tc.TABLE_NAME = kcu.TABLE_NAME
     WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
       AND tc.TABLE_NAME = @P1
     ORDER BY kcu.ORDINAL_POSITION";

#[async_trait]
impl SchemaIntrospection for MssqlConnection {
    /// List base tables of the current database
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let result = self
            .query(
                "SELECT TABLE_SCHEMA, TABLE_NAME
                 FROM INFORMATION_SCHEMA.TABLES
                 WHERE TABLE_TYPE = 'BASE TABLE'
                 ORDER BY TABLE_SCHEMA, TABLE_NAME",
                &[],
            )
            .await?;

        let tables = result
            .rows
            .iter()
            .map(|row| TableInfo {
                schema: row.get(0).and_then(|v| v.as_str()).map(|s| s.to_string()),
                name: row
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            })
            .collect();

        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_primary_key(&self, table: &str) -> Result<Option<PrimaryKeyInfo>> {
        let result = self
            .query(PRIMARY_KEY_QUERY, &[Value::String(table.to_string())])
            .await?;

        if result.rows.is_empty() {
            return Ok(None);
        }

        let name = result.rows[0]
            .get(1)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let columns = result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect();

        Ok(Some(PrimaryKeyInfo { name, columns }))
    }
}
