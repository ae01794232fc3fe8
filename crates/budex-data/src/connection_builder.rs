//! Connection descriptors

use budex_core::{
    BudexError, ConnectionConfig, DataConfig, Engine, Provider, Result, ResultExt, Source,
};
use std::path::{Path, PathBuf};

use crate::DataContext;

/// Everything needed to reach one table: where it lives, which engine reads
/// it and the resolved connection string.
///
/// Built once per logical query and immutable afterwards. The connection
/// string is resolved from the [`DataConfig`] at construction; nothing
/// downstream reads configuration again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionBuilder {
    source: Source,
    provider: Provider,
    engine: Engine,
    file_path: Option<PathBuf>,
    table_name: String,
    connection_string: String,
}

fn engine_of(provider: Provider) -> Result<Engine> {
    provider.engine().ok_or_else(|| {
        BudexError::Configuration(format!("Provider {} has no storage engine", provider))
    })
}

impl ConnectionBuilder {
    /// Descriptor for a registered source
    pub fn try_from_source(config: &DataConfig, source: Source, provider: Provider) -> Result<Self> {
        if source.is_external() {
            return Err(BudexError::Configuration(
                "Source External has no registry entry; build it from a file path".into(),
            ));
        }
        let engine = engine_of(provider)?;
        let file_path = config.database_path(source, provider);
        let connection_string = config.connection_string(provider, file_path.as_deref())?;

        tracing::debug!(
            source = %source,
            provider = %provider,
            path = ?file_path,
            "resolved connection descriptor"
        );
        Ok(Self {
            source,
            provider,
            engine,
            file_path,
            table_name: source.table_name().to_string(),
            connection_string,
        })
    }

    /// Descriptor for a file the caller points at.
    ///
    /// The provider is inferred from the extension when not given and the
    /// table is named after the file stem.
    pub fn try_from_path(
        config: &DataConfig,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BudexError::NotFound(format!("{}", path.display())));
        }

        let provider = match provider.or_else(|| Provider::from_path(path)) {
            Some(provider) => provider,
            None => {
                return Err(BudexError::Configuration(format!(
                    "Cannot infer a provider from {}",
                    path.display()
                )));
            }
        };
        let engine = engine_of(provider)?;

        let table_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                BudexError::Configuration(format!("{} has no file name", path.display()))
            })?;
        let connection_string = config.connection_string(provider, Some(path))?;

        tracing::debug!(path = %path.display(), provider = %provider, table = %table_name, "resolved file descriptor");
        Ok(Self {
            source: Source::External,
            provider,
            engine,
            file_path: Some(path.to_path_buf()),
            table_name,
            connection_string,
        })
    }

    /// Read `table_name` instead of the default table
    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Like [`Self::try_from_source`], reporting failures to the context's sink
    pub fn create(ctx: &DataContext, source: Source, provider: Provider) -> Option<Self> {
        Self::try_from_source(ctx.config(), source, provider).or_report(ctx.sink())
    }

    /// Like [`Self::try_from_path`], reporting failures to the context's sink
    pub fn create_from_path(
        ctx: &DataContext,
        path: impl AsRef<Path>,
        provider: Option<Provider>,
    ) -> Option<Self> {
        Self::try_from_path(ctx.config(), path, provider).or_report(ctx.sink())
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Backing file, `None` for server engines
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
    }

    /// Extension of the backing file, with its leading dot
    pub fn file_extension(&self) -> Option<String> {
        self.file_path
            .as_deref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// What a driver needs to open a connection for this descriptor
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.provider, self.connection_string.clone())
            .with_table(self.table_name.clone())
    }
}
