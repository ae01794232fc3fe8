//! Storage providers and the engine families they dispatch to

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Backend a source can be read from.
///
/// The provider decides which engine is used, which connection-string template
/// applies and where the backing file lives.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Provider {
    #[strum(serialize = "SQLite")]
    #[serde(rename = "SQLite")]
    Sqlite,
    SqlServer,
    SqlCe,
    Access,
    OleDb,
    Excel,
    #[strum(serialize = "CSV")]
    #[serde(rename = "CSV")]
    Csv,
    None,
}

impl Provider {
    /// Infer a provider from a file extension (without the dot, any case)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mdb" | "accdb" => Some(Provider::Access),
            "xlsx" | "xls" => Some(Provider::Excel),
            "csv" => Some(Provider::Csv),
            "db" | "sqlite" | "sqlite3" => Some(Provider::Sqlite),
            "sdf" => Some(Provider::SqlCe),
            _ => None,
        }
    }

    /// Infer a provider from a file path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Engine family, `None` for `Provider::None`
    pub fn engine(self) -> Option<Engine> {
        match self {
            Provider::Sqlite => Some(Engine::Sqlite),
            Provider::SqlServer => Some(Engine::SqlServer),
            Provider::SqlCe => Some(Engine::SqlCe),
            Provider::Access => Some(Engine::OleDb(FileFormat::Access)),
            Provider::OleDb => Some(Engine::OleDb(FileFormat::Generic)),
            Provider::Excel => Some(Engine::OleDb(FileFormat::Excel)),
            Provider::Csv => Some(Engine::OleDb(FileFormat::Csv)),
            Provider::None => None,
        }
    }

    /// File extension of the provider's backing store, `None` for servers
    pub fn file_extension(self) -> Option<&'static str> {
        match self {
            Provider::Sqlite => Some("db"),
            Provider::SqlCe => Some("sdf"),
            Provider::Access | Provider::OleDb => Some("accdb"),
            Provider::Excel => Some("xlsx"),
            Provider::Csv => Some("csv"),
            Provider::SqlServer | Provider::None => None,
        }
    }

    /// Whether every source of this provider lives in one shared database file
    pub fn is_shared_store(self) -> bool {
        matches!(
            self,
            Provider::Sqlite | Provider::SqlCe | Provider::Access | Provider::OleDb
        )
    }
}

/// File format handled by the OLE DB engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FileFormat {
    Access,
    Excel,
    Csv,
    Generic,
}

/// Engine family a provider dispatches to.
///
/// Every place that needs provider-specific behaviour matches on this
/// exhaustively, so adding an engine is a compile error until it is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Sqlite,
    SqlServer,
    SqlCe,
    OleDb(FileFormat),
}

impl Engine {
    /// Id of the driver that serves this engine
    pub fn driver_id(self) -> &'static str {
        match self {
            Engine::Sqlite => "sqlite",
            Engine::SqlServer => "mssql",
            Engine::SqlCe => "sqlce",
            Engine::OleDb(_) => "oledb",
        }
    }

    /// Placeholder for the `index`th (1-based) bound parameter
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Engine::Sqlite | Engine::OleDb(_) => "?".to_string(),
            Engine::SqlServer | Engine::SqlCe => format!("@P{}", index),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Sqlite => write!(f, "SQLite"),
            Engine::SqlServer => write!(f, "SQL Server"),
            Engine::SqlCe => write!(f, "SQL Server Compact"),
            Engine::OleDb(format) => write!(f, "OLE DB ({})", format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip() {
        for provider in Provider::iter() {
            let name = provider.to_string();
            assert_eq!(Provider::from_str(&name).ok(), Some(provider));
        }
        assert_eq!(Provider::Sqlite.to_string(), "SQLite");
        assert_eq!(Provider::Csv.to_string(), "CSV");
        assert_eq!(Provider::from_str("sqlserver").ok(), Some(Provider::SqlServer));
    }

    #[test]
    fn test_extension_inference() {
        assert_eq!(Provider::from_extension("ACCDB"), Some(Provider::Access));
        assert_eq!(Provider::from_extension("mdb"), Some(Provider::Access));
        assert_eq!(Provider::from_extension("xls"), Some(Provider::Excel));
        assert_eq!(Provider::from_extension("csv"), Some(Provider::Csv));
        assert_eq!(Provider::from_extension("sqlite3"), Some(Provider::Sqlite));
        assert_eq!(Provider::from_extension("sdf"), Some(Provider::SqlCe));
        assert_eq!(Provider::from_extension("txt"), None);
        assert_eq!(
            Provider::from_path(Path::new("/tmp/Budget.xlsx")),
            Some(Provider::Excel)
        );
    }

    #[test]
    fn test_engine_dispatch() {
        assert_eq!(Provider::None.engine(), None);
        assert_eq!(
            Provider::Csv.engine(),
            Some(Engine::OleDb(FileFormat::Csv))
        );
        assert_eq!(Engine::SqlServer.placeholder(2), "@P2");
        assert_eq!(Engine::Sqlite.placeholder(2), "?");
        assert_eq!(Engine::OleDb(FileFormat::Excel).driver_id(), "oledb");
    }
}
