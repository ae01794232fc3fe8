//! Executable commands, one per statement kind

use budex_core::{BudexError, Result};
use budex_drivers::block_on_tokio;
use strum::Display;

use crate::{CommandType, DataConnection, DataReader, SqlStatement};

/// How a reader treats its connection and result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum CommandBehavior {
    #[default]
    Default,
    /// Close the connection when the reader is closed or dropped
    CloseConnection,
    /// Only the first row is wanted
    SingleRow,
}

/// A statement bound to a connection
#[derive(Debug, Clone)]
pub struct DbCommand {
    statement: SqlStatement,
    connection: DataConnection,
}

impl DbCommand {
    pub fn command_type(&self) -> CommandType {
        self.statement.command_type()
    }

    pub fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    pub fn connection(&self) -> &DataConnection {
        &self.connection
    }

    fn check_parameters(&self) -> Result<()> {
        let limit = self.connection.capabilities().max_parameters;
        if self.statement.parameter_count() > limit {
            return Err(BudexError::Query(format!(
                "{} binds {} parameters; the {} engine accepts at most {}",
                self.statement.command_type(),
                self.statement.parameter_count(),
                self.connection.engine(),
                limit
            )));
        }
        Ok(())
    }

    /// Run a SELECT, opening the connection if needed
    #[tracing::instrument(skip(self), fields(table = %self.statement.table_name()))]
    pub fn execute_reader(&self, behavior: CommandBehavior) -> Result<DataReader> {
        if self.command_type() != CommandType::Select {
            return Err(BudexError::Query(format!(
                "{} does not return rows; use execute_non_query",
                self.command_type()
            )));
        }
        self.check_parameters()?;

        let conn = self.connection.connection()?;
        tracing::debug!(sql = %self.statement, "executing reader");
        let mut result = block_on_tokio(conn.query(self.statement.text(), self.statement.params()))?;

        if behavior == CommandBehavior::SingleRow {
            result.rows.truncate(1);
        }
        let owned = match behavior {
            CommandBehavior::CloseConnection => Some(self.connection.clone()),
            CommandBehavior::Default | CommandBehavior::SingleRow => None,
        };
        Ok(DataReader::new(result, owned))
    }

    /// Run an INSERT, UPDATE or DELETE; returns the affected row count
    #[tracing::instrument(skip(self), fields(table = %self.statement.table_name()))]
    pub fn execute_non_query(&self) -> Result<u64> {
        if self.command_type() == CommandType::Select {
            return Err(BudexError::Query(
                "SELECT returns rows; use execute_reader".into(),
            ));
        }
        if self.connection.capabilities().read_only {
            return Err(BudexError::NotSupported(format!(
                "The {} engine is read-only; {} is not available",
                self.connection.engine(),
                self.command_type()
            )));
        }
        self.check_parameters()?;

        let conn = self.connection.connection()?;
        tracing::debug!(sql = %self.statement, "executing non-query");
        let result = block_on_tokio(conn.execute(self.statement.text(), self.statement.params()))?;
        Ok(result.affected_rows)
    }
}

/// Produces commands of one kind each, bound to a connection
#[derive(Debug, Clone)]
pub struct CommandFactory {
    connection: DataConnection,
}

impl CommandFactory {
    pub fn new(connection: DataConnection) -> Self {
        Self { connection }
    }

    fn command(&self, expected: CommandType, statement: &SqlStatement) -> Result<DbCommand> {
        if statement.command_type() != expected {
            return Err(BudexError::Query(format!(
                "Expected a {} statement, got {}",
                expected,
                statement.command_type()
            )));
        }
        Ok(DbCommand {
            statement: statement.clone(),
            connection: self.connection.clone(),
        })
    }

    pub fn select_command(&self, statement: &SqlStatement) -> Result<DbCommand> {
        self.command(CommandType::Select, statement)
    }

    pub fn insert_command(&self, statement: &SqlStatement) -> Result<DbCommand> {
        self.command(CommandType::Insert, statement)
    }

    pub fn update_command(&self, statement: &SqlStatement) -> Result<DbCommand> {
        self.command(CommandType::Update, statement)
    }

    pub fn delete_command(&self, statement: &SqlStatement) -> Result<DbCommand> {
        self.command(CommandType::Delete, statement)
    }
}

/// Picks the factory method matching a statement's kind
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    factory: CommandFactory,
    statement: SqlStatement,
}

impl CommandBuilder {
    pub fn new(connection: DataConnection, statement: SqlStatement) -> Self {
        Self {
            factory: CommandFactory::new(connection),
            statement,
        }
    }

    pub fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    pub fn get_command(&self) -> Result<DbCommand> {
        match self.statement.command_type() {
            CommandType::Select => self.factory.select_command(&self.statement),
            CommandType::Insert => self.factory.insert_command(&self.statement),
            CommandType::Update => self.factory.update_command(&self.statement),
            CommandType::Delete => self.factory.delete_command(&self.statement),
        }
    }
}
