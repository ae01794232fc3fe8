//! Database driver trait definition

use crate::{Connection, ConnectionString, Provider, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities the data-access pipeline checks before running a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// The engine can only read (staged flat files)
    pub read_only: bool,
    /// The engine can report a table's primary key
    pub supports_primary_keys: bool,
    /// Maximum number of bound parameters per statement
    pub max_parameters: usize,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            read_only: false,
            supports_primary_keys: true,
            max_parameters: 999,
        }
    }
}

/// A storage engine able to open connections
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "sqlite", "mssql", "oledb")
    fn id(&self) -> &'static str {
        self.name()
    }

    /// Human-readable name (e.g., "SQLite", "SQL Server")
    fn name(&self) -> &'static str;

    /// Display name for UI
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Supported features/capabilities
    fn capabilities(&self) -> DriverCapabilities;

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Test connection without keeping it open
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        conn.close().await
    }
}

/// Everything a driver needs to open one connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Unique identifier, used to correlate log lines
    pub id: uuid::Uuid,
    /// Provider the connection was resolved for
    pub provider: Provider,
    /// Fully resolved connection string
    pub connection_string: String,
    /// Table the connection is going to be queried for.
    ///
    /// Flat-file engines stage exactly this table.
    pub table_name: Option<String>,
}

impl ConnectionConfig {
    pub fn new(provider: Provider, connection_string: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            provider,
            connection_string: connection_string.into(),
            table_name: None,
        }
    }

    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Parsed form of the connection string
    pub fn parsed(&self) -> ConnectionString {
        ConnectionString::parse(&self.connection_string)
    }

    /// The `Data Source` entry of the connection string
    pub fn data_source(&self) -> Option<String> {
        self.parsed().data_source().map(str::to_string)
    }
}
