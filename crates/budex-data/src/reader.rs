//! Forward-only row readers

use budex_core::{ColumnMeta, QueryResult, Row};

use crate::DataConnection;

/// Rows of one executed SELECT, read front to back.
///
/// A reader created with `CommandBehavior::CloseConnection` closes its
/// connection when it is closed or dropped.
pub struct DataReader {
    columns: Vec<ColumnMeta>,
    rows: std::vec::IntoIter<Row>,
    warnings: Vec<String>,
    owned_connection: Option<DataConnection>,
    closed: bool,
}

impl DataReader {
    pub(crate) fn new(result: QueryResult, owned_connection: Option<DataConnection>) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows.into_iter(),
            warnings: result.warnings,
            owned_connection,
            closed: false,
        }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Ordinal of a column, ignoring case
    pub fn get_ordinal(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Rows skipped while reading
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop reading. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rows = Vec::new().into_iter();
        if let Some(connection) = self.owned_connection.take() {
            if let Err(e) = connection.close() {
                tracing::warn!(error = %e, "failed to close connection behind reader");
            }
        }
    }
}

impl Iterator for DataReader {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.closed {
            return None;
        }
        self.rows.next()
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("fields", &self.columns.len())
            .field("remaining", &self.rows.len())
            .field("closed", &self.closed)
            .finish()
    }
}
