//! Flat-file driver implementation

use async_trait::async_trait;
use budex_core::{
    BudexError, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Engine,
    FileFormat, Provider, Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::FileConnection;
use crate::staging::{stage_csv, stage_excel};

/// Driver for the OLE DB engine family: CSV files and Excel workbooks.
///
/// Access databases belong to the same family but have no engine outside the
/// Windows OLE DB provider and are reported as unsupported.
pub struct FileDriver;

impl FileDriver {
    pub fn new() -> Self {
        tracing::debug!("flat-file driver initialized");
        Self
    }
}

impl Default for FileDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Which file to stage, and as what
fn resolve_target(config: &ConnectionConfig) -> Result<(FileFormat, PathBuf, String)> {
    let format = match config.provider.engine() {
        Some(Engine::OleDb(format)) => format,
        Some(engine) => {
            return Err(BudexError::Configuration(format!(
                "The flat-file driver cannot serve the {} engine",
                engine
            )));
        }
        None => {
            return Err(BudexError::Configuration(
                "Provider None has no engine".into(),
            ));
        }
    };

    let data_source = config.data_source().ok_or_else(|| {
        BudexError::Configuration("Flat-file connections need a 'Data Source' entry".into())
    })?;
    let data_source = PathBuf::from(data_source);

    // A generic OLE DB source is identified by its file extension
    let format = match format {
        FileFormat::Generic => match Provider::from_path(&data_source) {
            Some(Provider::Csv) => FileFormat::Csv,
            Some(Provider::Excel) => FileFormat::Excel,
            _ => FileFormat::Access,
        },
        other => other,
    };

    let table = match (&config.table_name, format) {
        (Some(table), _) => table.clone(),
        (None, FileFormat::Csv | FileFormat::Excel) => file_stem(&data_source)?,
        (None, _) => String::new(),
    };

    let path = match format {
        // The CSV Data Source is the directory holding one file per table
        FileFormat::Csv if data_source.is_dir() || data_source.extension().is_none() => {
            data_source.join(format!("{}.csv", table))
        }
        _ => data_source,
    };

    Ok((format, path, table))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            BudexError::Configuration(format!("Cannot derive a table name from {}", path.display()))
        })
}

#[async_trait]
impl DatabaseDriver for FileDriver {
    fn id(&self) -> &'static str {
        "oledb"
    }

    fn name(&self) -> &'static str {
        "oledb"
    }

    fn display_name(&self) -> &'static str {
        "Flat files (CSV, Excel)"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            read_only: true,
            supports_primary_keys: false,
            max_parameters: 999,
        }
    }

    #[tracing::instrument(skip(self, config), fields(id = %config.id, provider = %config.provider))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let (format, path, table) = resolve_target(config)?;

        let staged = match format {
            FileFormat::Csv => stage_csv(&path)?,
            FileFormat::Excel => stage_excel(&path, &table)?,
            FileFormat::Access | FileFormat::Generic => {
                return Err(BudexError::NotSupported(format!(
                    "{} needs the Windows OLE DB provider, which is not available",
                    path.display()
                )));
            }
        };

        let conn = FileConnection::load(&path, format, &table, staged)?;
        Ok(Arc::new(conn))
    }
}
