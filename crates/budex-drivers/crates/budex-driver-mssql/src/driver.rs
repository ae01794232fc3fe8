//! MS SQL Server driver implementation

use crate::connection::MssqlConnection;
use async_trait::async_trait;
use budex_core::{Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Result};
use std::sync::Arc;

/// MS SQL Server database driver
pub struct MssqlDriver;

impl MssqlDriver {
    /// Create a new MS SQL Server driver instance
    pub fn new() -> Self {
        tracing::debug!("MS SQL Server driver initialized");
        Self
    }
}

impl Default for MssqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    fn id(&self) -> &'static str {
        "mssql"
    }

    fn name(&self) -> &'static str {
        "mssql"
    }

    fn display_name(&self) -> &'static str {
        "MS SQL Server"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            read_only: false,
            supports_primary_keys: true,
            // SQL Server limit
            max_parameters: 2100,
        }
    }

    #[tracing::instrument(skip(self, config), fields(id = %config.id))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        tracing::debug!("connecting to MS SQL Server");
        let connection = MssqlConnection::connect(&config.connection_string).await?;
        Ok(Arc::new(connection))
    }
}
