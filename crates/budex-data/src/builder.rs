//! Materialized results for domain entities
//!
//! [`DataBuilder`] runs the whole pipeline at construction and keeps the
//! filled table, its first row and an index of distinct string values.
//! Entities narrow a parent result to children with [`DataBuilder::filter_data`],
//! which works on the rows already in memory.

use budex_core::{BudexError, ColumnKind, Provider, Result, ResultExt, Source, Value};
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

use crate::{ConnectionBuilder, DataContext, DataRow, DataTable, FilterArgs, Query, SqlStatement};

/// Conversion from a row into a domain entity
pub trait FromRecord: Sized {
    fn from_record(row: &DataRow) -> Result<Self>;
}

/// How the table was obtained, kept for `refresh`
#[derive(Debug, Clone)]
enum Origin {
    Source {
        source: Source,
        provider: Provider,
        args: FilterArgs,
    },
    Path {
        path: PathBuf,
        provider: Option<Provider>,
        args: FilterArgs,
    },
    Parts {
        builder: ConnectionBuilder,
        statement: SqlStatement,
    },
}

impl Origin {
    fn query(&self, ctx: &DataContext) -> Result<Query> {
        match self {
            Origin::Source {
                source,
                provider,
                args,
            } => Query::try_new(ctx, *source, *provider, args.clone()),
            Origin::Path {
                path,
                provider,
                args,
            } => Query::try_from_path(ctx, path, *provider, args.clone()),
            Origin::Parts { builder, statement } => {
                Query::try_from_parts(ctx, builder.clone(), statement.clone())
            }
        }
    }
}

/// A filled table with its first record and program elements
#[derive(Debug)]
pub struct DataBuilder {
    ctx: DataContext,
    origin: Option<Origin>,
    table: DataTable,
    program_elements: IndexMap<String, IndexSet<String>>,
}

impl DataBuilder {
    fn empty(ctx: &DataContext, origin: Option<Origin>) -> Self {
        Self {
            ctx: ctx.clone(),
            origin,
            table: DataTable::new(""),
            program_elements: IndexMap::new(),
        }
    }

    fn load(ctx: &DataContext, origin: Origin) -> Result<Self> {
        let mut query = origin.query(ctx)?;
        let table = query.try_get_table();
        query.dispose();
        let table = table?;

        let mut builder = Self::empty(ctx, Some(origin));
        builder.set_table(table);
        Ok(builder)
    }

    fn set_table(&mut self, table: DataTable) {
        self.program_elements = index_program_elements(&table);
        tracing::debug!(
            table = %table.name(),
            rows = table.row_count(),
            columns = table.column_count(),
            "data materialized"
        );
        self.table = table;
    }

    /// Run the pipeline for a registered source
    pub fn try_new(ctx: &DataContext, source: Source, provider: Provider, args: FilterArgs) -> Result<Self> {
        Self::load(
            ctx,
            Origin::Source {
                source,
                provider,
                args,
            },
        )
    }

    /// Run the pipeline for a file
    pub fn try_from_path(
        ctx: &DataContext,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
        args: FilterArgs,
    ) -> Result<Self> {
        Self::load(
            ctx,
            Origin::Path {
                path: path.as_ref().to_path_buf(),
                provider,
                args,
            },
        )
    }

    /// Fill from an existing query, which is disposed afterwards
    pub fn try_from_query(mut query: Query) -> Result<Self> {
        let ctx = query.context().clone();
        let origin = Origin::Parts {
            builder: query.connection_builder().clone(),
            statement: query.statement().clone(),
        };
        let table = query.try_get_table();
        query.dispose();

        let mut builder = Self::empty(&ctx, Some(origin));
        builder.set_table(table?);
        Ok(builder)
    }

    /// Like [`Self::try_new`]; on failure the error is reported and the builder is empty
    pub fn new(ctx: &DataContext, source: Source, provider: Provider, args: FilterArgs) -> Self {
        let origin = Origin::Source {
            source,
            provider,
            args: args.clone(),
        };
        Self::try_new(ctx, source, provider, args)
            .or_report(ctx.sink())
            .unwrap_or_else(|| Self::empty(ctx, Some(origin)))
    }

    /// Like [`Self::try_from_path`]; on failure the error is reported and the builder is empty
    pub fn from_path(
        ctx: &DataContext,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
        args: FilterArgs,
    ) -> Self {
        let path = path.as_ref();
        Self::try_from_path(ctx, path, provider, args.clone())
            .or_report(ctx.sink())
            .unwrap_or_else(|| {
                Self::empty(
                    ctx,
                    Some(Origin::Path {
                        path: path.to_path_buf(),
                        provider,
                        args,
                    }),
                )
            })
    }

    /// Like [`Self::try_from_query`]; on failure the error is reported and the builder is empty
    pub fn from_query(query: Query) -> Self {
        let ctx = query.context().clone();
        Self::try_from_query(query)
            .or_report(ctx.sink())
            .unwrap_or_else(|| Self::empty(&ctx, None))
    }

    /// Run the pipeline again, replacing the table
    pub fn try_refresh(&mut self) -> Result<()> {
        let origin = self.origin.clone().ok_or_else(|| {
            BudexError::InvalidState("Builder has no query to refresh from".into())
        })?;
        let refreshed = Self::load(&self.ctx, origin)?;
        self.set_table(refreshed.table);
        Ok(())
    }

    /// Like [`Self::try_refresh`]; on failure the error is reported and the builder is emptied
    pub fn refresh(&mut self) {
        if let Err(e) = self.try_refresh() {
            self.ctx.report(&e);
            let name = self.table.name().to_string();
            self.set_table(DataTable::new(name));
        }
    }

    /// Every row
    pub fn get_data(&self) -> &[DataRow] {
        self.table.rows()
    }

    /// The first row
    pub fn get_record(&self) -> Option<&DataRow> {
        self.table.row(0)
    }

    /// The first row as column → value, empty without rows
    pub fn to_dictionary(&self) -> IndexMap<String, Value> {
        self.get_record().map(DataRow::to_map).unwrap_or_default()
    }

    /// Distinct non-empty values of every string column
    pub fn program_elements(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.program_elements
    }

    /// Rows whose `field` renders as `value`
    pub fn filter_data(&self, field: &str, value: &str) -> Vec<&DataRow> {
        self.get_data()
            .iter()
            .filter(|row| row.text(field).as_deref() == Some(value))
            .collect()
    }

    /// Column name → ordinal
    pub fn column_ordinals(&self) -> IndexMap<String, usize> {
        self.table
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.ordinal))
            .collect()
    }

    /// Integer identity of every row: the first key column, or the first
    /// column when the table has no key. Rows without an integer there are
    /// skipped.
    pub fn primary_indexes(&self) -> Vec<i64> {
        let ordinal = self.table.primary_key_ordinals().first().copied().unwrap_or(0);
        self.get_data()
            .iter()
            .filter_map(|row| row.get(ordinal).and_then(Value::as_i64))
            .collect()
    }

    pub fn get_table(&self) -> &DataTable {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Map every row to an entity, stopping at the first failure
    pub fn try_records_as<T: FromRecord>(&self) -> Result<Vec<T>> {
        self.get_data().iter().map(T::from_record).collect()
    }

    /// Like [`Self::try_records_as`]; on failure the error is reported and nothing is returned
    pub fn records_as<T: FromRecord>(&self) -> Vec<T> {
        self.try_records_as()
            .or_report(self.ctx.sink())
            .unwrap_or_default()
    }

    /// Distinct rendered values of `field`, optionally only over rows where
    /// the `(column, value)` filter matches
    pub fn get_values(rows: &[DataRow], field: &str, filter: Option<(&str, &str)>) -> Vec<String> {
        let values: IndexSet<String> = rows
            .iter()
            .filter(|row| match filter {
                Some((column, value)) => row.text(column).as_deref() == Some(value),
                None => true,
            })
            .filter_map(|row| row.text(field))
            .filter(|text| !text.trim().is_empty())
            .collect();
        values.into_iter().collect()
    }

    /// Distinct rendered values of each of `fields`
    pub fn get_series(rows: &[DataRow], fields: &[&str]) -> IndexMap<String, Vec<String>> {
        fields
            .iter()
            .map(|field| (field.to_string(), Self::get_values(rows, field, None)))
            .collect()
    }
}

fn index_program_elements(table: &DataTable) -> IndexMap<String, IndexSet<String>> {
    table
        .columns()
        .iter()
        .filter(|column| column.kind == ColumnKind::String)
        .map(|column| {
            let values = table
                .rows()
                .iter()
                .filter_map(|row| row.get(column.ordinal).and_then(Value::to_text))
                .filter(|text| !text.trim().is_empty())
                .collect();
            (column.name.clone(), values)
        })
        .collect()
}
