//! budex drivers - engine implementations behind the data-access layer
//!
//! This crate gathers the concrete engines implementing the traits defined in
//! `budex-core` and provides the runtime the synchronous surface drives them on.

#[cfg(feature = "files")]
pub use budex_driver_files as files;
#[cfg(feature = "mssql")]
pub use budex_driver_mssql as mssql;
#[cfg(feature = "sqlite")]
pub use budex_driver_sqlite as sqlite;

mod registry;
mod runtime;

pub use registry::DriverRegistry;
pub use runtime::{block_on_tokio, get_tokio_runtime};

/// Re-export commonly used types from budex-core
pub use budex_core::{
    BudexError, ColumnMeta, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities,
    QueryResult, Result, Row, SchemaIntrospection, StatementResult, Value,
};

#[cfg(test)]
mod tests {
    use super::*;
    use budex_core::{Engine, FileFormat};

    #[test]
    #[cfg(all(feature = "sqlite", feature = "mssql", feature = "files"))]
    fn test_default_registry_covers_engines() {
        let registry = DriverRegistry::with_defaults();
        assert_eq!(registry.list(), vec!["mssql", "oledb", "sqlite"]);
        assert!(registry.for_engine(Engine::Sqlite).is_ok());
        assert!(registry.for_engine(Engine::OleDb(FileFormat::Csv)).is_ok());
        assert!(matches!(
            registry.for_engine(Engine::SqlCe),
            Err(BudexError::NotSupported(_))
        ));
    }

    #[test]
    fn test_empty_registry_is_configuration_error() {
        let registry = DriverRegistry::new();
        assert!(!registry.has("sqlite"));
        assert!(matches!(
            registry.for_engine(Engine::Sqlite),
            Err(BudexError::Configuration(_))
        ));
    }

    #[test]
    fn test_block_on_tokio_runs_future() {
        assert_eq!(block_on_tokio(async { 40 + 2 }), 42);
    }
}
