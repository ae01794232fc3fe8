//! Per-request query sessions

use budex_core::{BudexError, Provider, Result, ResultExt, Source};
use std::cell::Cell;
use std::path::Path;
use strum::Display;

use crate::{
    AdapterFactory, CommandBehavior, CommandBuilder, CommandType, ConnectionBuilder,
    ConnectionFactory, DataAdapter, DataConnection, DataContext, DataReader, DataTable, DbCommand,
    FilterArgs, SqlStatement,
};

/// Lifecycle of a [`Query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum QueryState {
    /// Built, nothing executed yet
    Constructed,
    /// At least one command ran
    Active,
    /// Connection released; every further operation fails
    Disposed,
}

/// One request against one table.
///
/// Owns the connection, the command builder and, for SELECT statements, the
/// fill adapter. Dropping the query disposes it. A query serves one request
/// at a time and is not shared between threads.
pub struct Query {
    ctx: DataContext,
    builder: ConnectionBuilder,
    statement: SqlStatement,
    connection: DataConnection,
    commands: CommandBuilder,
    adapter: Option<DataAdapter>,
    state: Cell<QueryState>,
}

impl Query {
    /// SELECT from a registered source
    pub fn try_new(ctx: &DataContext, source: Source, provider: Provider, args: FilterArgs) -> Result<Self> {
        let builder = ConnectionBuilder::try_from_source(ctx.config(), source, provider)?;
        let statement = SqlStatement::new(&builder, CommandType::Select, args)?;
        Self::try_from_parts(ctx, builder, statement)
    }

    /// SELECT from a file
    pub fn try_from_path(
        ctx: &DataContext,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
        args: FilterArgs,
    ) -> Result<Self> {
        let builder = ConnectionBuilder::try_from_path(ctx.config(), path, provider)?;
        let statement = SqlStatement::new(&builder, CommandType::Select, args)?;
        Self::try_from_parts(ctx, builder, statement)
    }

    /// Any statement against a descriptor
    pub fn try_from_parts(ctx: &DataContext, builder: ConnectionBuilder, statement: SqlStatement) -> Result<Self> {
        let connection = ConnectionFactory::new(ctx, &builder)?.get_connection();
        let commands = CommandBuilder::new(connection.clone(), statement.clone());
        let adapter = match statement.command_type() {
            CommandType::Select => {
                Some(AdapterFactory::new(ctx, connection.clone(), statement.clone()).get_adapter()?)
            }
            CommandType::Insert | CommandType::Update | CommandType::Delete => None,
        };

        tracing::debug!(
            source = %builder.source(),
            provider = %builder.provider(),
            sql = %statement,
            "query constructed"
        );
        Ok(Self {
            ctx: ctx.clone(),
            builder,
            statement,
            connection,
            commands,
            adapter,
            state: Cell::new(QueryState::Constructed),
        })
    }

    pub fn new(ctx: &DataContext, source: Source, provider: Provider, args: FilterArgs) -> Option<Self> {
        Self::try_new(ctx, source, provider, args).or_report(ctx.sink())
    }

    pub fn from_path(
        ctx: &DataContext,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
        args: FilterArgs,
    ) -> Option<Self> {
        Self::try_from_path(ctx, path, provider, args).or_report(ctx.sink())
    }

    pub fn from_parts(ctx: &DataContext, builder: ConnectionBuilder, statement: SqlStatement) -> Option<Self> {
        Self::try_from_parts(ctx, builder, statement).or_report(ctx.sink())
    }

    pub fn state(&self) -> QueryState {
        self.state.get()
    }

    pub fn context(&self) -> &DataContext {
        &self.ctx
    }

    pub fn connection_builder(&self) -> &ConnectionBuilder {
        &self.builder
    }

    pub fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    pub fn connection(&self) -> &DataConnection {
        &self.connection
    }

    pub fn command_builder(&self) -> &CommandBuilder {
        &self.commands
    }

    /// The fill adapter; only SELECT queries have one
    pub fn adapter(&self) -> Result<&DataAdapter> {
        self.ensure_live()?;
        self.adapter.as_ref().ok_or_else(|| {
            BudexError::Query(format!(
                "{} statements have no fill adapter",
                self.statement.command_type()
            ))
        })
    }

    fn ensure_live(&self) -> Result<()> {
        match self.state.get() {
            QueryState::Disposed => Err(BudexError::InvalidState(format!(
                "Query on {} has been disposed",
                self.statement.table_name()
            ))),
            QueryState::Constructed | QueryState::Active => Ok(()),
        }
    }

    /// Execute `command`, or the query's own statement, and read its rows.
    ///
    /// If execution fails the connection is closed before the error is returned.
    pub fn try_get_data_reader(&self, command: Option<DbCommand>, behavior: CommandBehavior) -> Result<DataReader> {
        self.ensure_live()?;
        let command = match command {
            Some(command) => command,
            None => self.commands.get_command()?,
        };
        self.state.set(QueryState::Active);

        command.execute_reader(behavior).inspect_err(|_| {
            if let Err(e) = command.connection().close() {
                tracing::warn!(error = %e, "failed to close connection after failed read");
            }
        })
    }

    pub fn get_data_reader(&self, behavior: CommandBehavior) -> Option<DataReader> {
        self.try_get_data_reader(None, behavior)
            .or_report(self.ctx.sink())
    }

    /// Fill a new table from the query's SELECT
    pub fn try_get_table(&self) -> Result<DataTable> {
        let adapter = self.adapter()?;
        self.state.set(QueryState::Active);
        adapter.fill_table()
    }

    pub fn get_table(&self) -> Option<DataTable> {
        self.try_get_table().or_report(self.ctx.sink())
    }

    /// Run the query's INSERT, UPDATE or DELETE; returns the affected row count
    pub fn try_execute(&self) -> Result<u64> {
        self.ensure_live()?;
        let command = self.commands.get_command()?;
        self.state.set(QueryState::Active);
        command.execute_non_query()
    }

    pub fn execute(&self) -> Option<u64> {
        self.try_execute().or_report(self.ctx.sink())
    }

    /// Release the connection. Disposing twice is a no-op.
    pub fn dispose(&mut self) {
        if self.state.get() == QueryState::Disposed {
            return;
        }
        if let Err(e) = self.connection.close() {
            tracing::warn!(table = %self.statement.table_name(), error = %e, "failed to close connection on dispose");
        }
        self.state.set(QueryState::Disposed);
        tracing::debug!(table = %self.statement.table_name(), "query disposed");
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("source", &self.builder.source())
            .field("provider", &self.builder.provider())
            .field("statement", &self.statement.to_string())
            .field("state", &self.state.get())
            .finish()
    }
}
