//! Fill adapters
//!
//! An adapter runs a SELECT and merges its rows into a [`DataTable`]. The
//! defaults describe a best-effort bulk load: unreadable rows are skipped,
//! unknown columns are added with the table's key, unmapped columns keep
//! their names. Only a failure to run the statement fails a fill.

use budex_core::{BudexError, ColumnKind, Connection, Engine, QueryResult, Result, Value};
use budex_drivers::block_on_tokio;
use indexmap::IndexMap;
use std::sync::Arc;
use strum::Display;

use crate::{
    CommandFactory, ConnectionState, DataColumn, DataConnection, DataContext, DataTable, DbCommand,
    RowState, SchemaCache, SqlStatement,
};

/// What to do with result columns the table does not have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum MissingSchemaAction {
    Add,
    /// Add the column and load the table's primary key
    #[default]
    AddWithKey,
    Ignore,
    Error,
}

/// What to do with result columns that have no mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum MissingMappingAction {
    /// Keep the source column name
    #[default]
    Passthrough,
    Ignore,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    pub missing_schema_action: MissingSchemaAction,
    pub missing_mapping_action: MissingMappingAction,
    /// Skip rows that fail to convert instead of failing the fill
    pub continue_on_error: bool,
    /// Mark filled rows `Unchanged` rather than `Added`
    pub accept_changes_during_fill: bool,
    /// Source column → table column
    pub column_mappings: IndexMap<String, String>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            missing_schema_action: MissingSchemaAction::AddWithKey,
            missing_mapping_action: MissingMappingAction::Passthrough,
            continue_on_error: true,
            accept_changes_during_fill: true,
            column_mappings: IndexMap::new(),
        }
    }
}

/// Adapter flavour, one per engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AdapterKind {
    Sqlite,
    SqlCe,
    SqlServer,
    OleDb,
}

impl From<Engine> for AdapterKind {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Sqlite => AdapterKind::Sqlite,
            Engine::SqlCe => AdapterKind::SqlCe,
            Engine::SqlServer => AdapterKind::SqlServer,
            Engine::OleDb(_) => AdapterKind::OleDb,
        }
    }
}

/// Runs one SELECT into tables
#[derive(Debug, Clone)]
pub struct DataAdapter {
    kind: AdapterKind,
    options: AdapterOptions,
    select: DbCommand,
    schema_cache: Arc<SchemaCache>,
}

impl DataAdapter {
    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn select_command(&self) -> &DbCommand {
        &self.select
    }

    /// Fill a new table named after the statement's table
    pub fn fill_table(&self) -> Result<DataTable> {
        let mut table = DataTable::new(self.select.statement().table_name());
        self.fill(&mut table)?;
        Ok(table)
    }

    /// Merge the SELECT's rows into `table`; returns the number of rows filled.
    ///
    /// The connection is opened if it was closed and closed again afterwards.
    #[tracing::instrument(skip(self, table), fields(kind = %self.kind, table = %self.select.statement().table_name()))]
    pub fn fill(&self, table: &mut DataTable) -> Result<usize> {
        let connection = self.select.connection();
        let was_open = connection.state() == ConnectionState::Open;

        let result = connection
            .connection()
            .and_then(|conn| self.fill_from(conn.as_ref(), connection, table));

        if !was_open {
            if let Err(e) = connection.close() {
                tracing::warn!(error = %e, "failed to close connection after fill");
            }
        }
        result
    }

    fn fill_from(
        &self,
        conn: &dyn Connection,
        connection: &DataConnection,
        table: &mut DataTable,
    ) -> Result<usize> {
        let statement = self.select.statement();
        let result = if self.options.continue_on_error {
            block_on_tokio(conn.query_lenient(statement.text(), statement.params()))?
        } else {
            block_on_tokio(conn.query(statement.text(), statement.params()))?
        };
        for warning in &result.warnings {
            tracing::warn!(table = %statement.table_name(), warning = %warning, "row skipped during fill");
        }

        let targets = self.map_columns(&result, table)?;

        if self.options.missing_schema_action == MissingSchemaAction::AddWithKey
            && table.primary_key().is_empty()
        {
            let key = self.primary_key(conn, connection, statement.table_name());
            if !key.is_empty() && !table.set_primary_key(key.clone()) {
                tracing::debug!(key = ?key, "primary key columns not in result, fill without key");
            }
        }

        let state = if self.options.accept_changes_during_fill {
            RowState::Unchanged
        } else {
            RowState::Added
        };

        let width = table.column_count();
        let mut filled = 0;
        for row in result.rows {
            let mut values = vec![Value::Null; width];
            for (value, target) in row.values.into_iter().zip(&targets) {
                if let Some(idx) = target {
                    values[*idx] = value;
                }
            }
            match table.find_by_key(&values) {
                Some(existing) => table.replace_row(existing, values, state),
                None => table.push_row(values, state),
            }
            filled += 1;
        }

        table.refresh_captions();
        tracing::debug!(rows = filled, skipped = result.warnings.len(), "fill complete");
        Ok(filled)
    }

    /// Table ordinal for every result column, `None` for dropped columns
    fn map_columns(&self, result: &QueryResult, table: &mut DataTable) -> Result<Vec<Option<usize>>> {
        let mut targets = Vec::with_capacity(result.columns.len());
        for (ordinal, meta) in result.columns.iter().enumerate() {
            let name = match self.options.column_mappings.get(&meta.name) {
                Some(mapped) => mapped.clone(),
                None => match self.options.missing_mapping_action {
                    MissingMappingAction::Passthrough => meta.name.clone(),
                    MissingMappingAction::Ignore => {
                        targets.push(None);
                        continue;
                    }
                    MissingMappingAction::Error => {
                        return Err(BudexError::Schema(format!(
                            "No column mapping for source column '{}'",
                            meta.name
                        )));
                    }
                },
            };

            if let Some(idx) = table.column_index(&name) {
                targets.push(Some(idx));
                continue;
            }

            match self.options.missing_schema_action {
                MissingSchemaAction::Add | MissingSchemaAction::AddWithKey => {
                    let mut column = DataColumn::from_meta(&name, meta);
                    if column.kind == ColumnKind::Unknown {
                        column.kind = infer_kind(result, ordinal);
                    }
                    targets.push(Some(table.add_column(column)));
                }
                MissingSchemaAction::Ignore => targets.push(None),
                MissingSchemaAction::Error => {
                    return Err(BudexError::Schema(format!(
                        "Table {} has no column '{}'",
                        table.name(),
                        name
                    )));
                }
            }
        }
        Ok(targets)
    }

    /// Key columns of `table`, from the cache or the engine
    fn primary_key(&self, conn: &dyn Connection, connection: &DataConnection, table: &str) -> Vec<String> {
        let cache_key = connection.config().connection_string.as_str();
        if let Some(key) = self.schema_cache.primary_key(cache_key, table) {
            return key;
        }

        let key = match conn.as_schema_introspection() {
            Some(schema) if connection.capabilities().supports_primary_keys => {
                match block_on_tokio(schema.get_primary_key(table)) {
                    Ok(Some(pk)) => pk.columns,
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(table = %table, error = %e, "primary key lookup failed");
                        return Vec::new();
                    }
                }
            }
            _ => Vec::new(),
        };
        self.schema_cache
            .set_primary_key(cache_key, table, key.clone());
        key
    }
}

/// Kind of an undeclared column, from its first non-null value
fn infer_kind(result: &QueryResult, ordinal: usize) -> ColumnKind {
    result
        .rows
        .iter()
        .filter_map(|row| row.get(ordinal))
        .find(|value| !value.is_null())
        .map(ColumnKind::from_value)
        .unwrap_or(ColumnKind::Unknown)
}

/// Configures a [`DataAdapter`]
#[derive(Clone)]
pub struct AdapterBuilder {
    connection: DataConnection,
    statement: SqlStatement,
    options: AdapterOptions,
    schema_cache: Arc<SchemaCache>,
}

impl AdapterBuilder {
    pub fn new(ctx: &DataContext, connection: DataConnection, statement: SqlStatement) -> Self {
        Self {
            connection,
            statement,
            options: AdapterOptions::default(),
            schema_cache: ctx.schema_cache().clone(),
        }
    }

    pub fn options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn missing_schema_action(mut self, action: MissingSchemaAction) -> Self {
        self.options.missing_schema_action = action;
        self
    }

    pub fn missing_mapping_action(mut self, action: MissingMappingAction) -> Self {
        self.options.missing_mapping_action = action;
        self
    }

    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.options.continue_on_error = enabled;
        self
    }

    pub fn accept_changes_during_fill(mut self, enabled: bool) -> Self {
        self.options.accept_changes_during_fill = enabled;
        self
    }

    /// Fill source column `source` into table column `target`
    pub fn map_column(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.options
            .column_mappings
            .insert(source.into(), target.into());
        self
    }

    /// The statement must be a SELECT
    pub fn build(self) -> Result<DataAdapter> {
        let select = CommandFactory::new(self.connection.clone()).select_command(&self.statement)?;
        Ok(DataAdapter {
            kind: AdapterKind::from(self.connection.engine()),
            options: self.options,
            select,
            schema_cache: self.schema_cache,
        })
    }
}

/// Adapters with the default bulk-load options
pub struct AdapterFactory {
    builder: AdapterBuilder,
}

impl AdapterFactory {
    pub fn new(ctx: &DataContext, connection: DataConnection, statement: SqlStatement) -> Self {
        Self {
            builder: AdapterBuilder::new(ctx, connection, statement),
        }
    }

    pub fn get_adapter(&self) -> Result<DataAdapter> {
        self.builder.clone().build()
    }
}
