//! SQLite driver implementation

use async_trait::async_trait;
use budex_core::{
    BudexError, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Result,
};
use std::path::Path;
use std::sync::Arc;

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            read_only: false,
            supports_primary_keys: true,
            max_parameters: 999,
        }
    }

    #[tracing::instrument(skip(self, config), fields(id = %config.id, path = config.data_source().as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = config.data_source().ok_or_else(|| {
            BudexError::Configuration(
                "SQLite requires a 'Data Source' entry. Example: Data Source=/path/to/Data.db;"
                    .into(),
            )
        })?;

        let conn = if path == ":memory:" {
            SqliteConnection::open_in_memory()
        } else {
            SqliteConnection::open(Path::new(&path))
        }
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }

    #[tracing::instrument(skip(self, config))]
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!("testing SQLite connection");
        let conn = self.connect(config).await?;
        conn.query("SELECT 1", &[]).await?;
        conn.close().await
    }
}
