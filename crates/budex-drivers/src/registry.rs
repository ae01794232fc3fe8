//! Driver registry for the available engines

use budex_core::{BudexError, DatabaseDriver, Engine, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available database drivers, keyed by driver id
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "mssql")]
        registry.register(Arc::new(crate::mssql::MssqlDriver::new()));
        #[cfg(feature = "files")]
        registry.register(Arc::new(crate::files::FileDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let id = driver.id().to_string();
        tracing::info!(driver = %id, "registering database driver");
        self.drivers.insert(id, driver);
    }

    /// Get a driver by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(id).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %id, "driver not found in registry");
        }
        driver
    }

    /// Driver serving an engine family
    pub fn for_engine(&self, engine: Engine) -> Result<Arc<dyn DatabaseDriver>> {
        if let Some(driver) = self.get(engine.driver_id()) {
            return Ok(driver);
        }
        match engine {
            Engine::SqlCe => Err(BudexError::NotSupported(
                "SQL Server Compact has no engine on this platform".into(),
            )),
            Engine::Sqlite | Engine::SqlServer | Engine::OleDb(_) => {
                Err(BudexError::Configuration(format!(
                    "No driver registered for the {} engine (driver id '{}')",
                    engine,
                    engine.driver_id()
                )))
            }
        }
    }

    /// List all registered driver ids, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.drivers.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Check if a driver is registered
    pub fn has(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
