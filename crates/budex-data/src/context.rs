//! Injected collaborators shared by every pipeline stage

use budex_core::{BudexError, DataConfig, ErrorSink, TracingSink};
use budex_drivers::DriverRegistry;
use std::sync::Arc;

use crate::SchemaCache;

/// Configuration, drivers, error sink and schema cache for one application.
///
/// Cloning is cheap; every clone shares the same collaborators. The
/// configuration is read-only once the context exists.
#[derive(Clone)]
pub struct DataContext {
    config: Arc<DataConfig>,
    drivers: Arc<DriverRegistry>,
    sink: Arc<dyn ErrorSink>,
    schema_cache: Arc<SchemaCache>,
}

impl DataContext {
    /// Context with the built-in drivers, reporting through `tracing`
    pub fn new(config: DataConfig) -> Self {
        Self {
            config: Arc::new(config),
            drivers: Arc::new(DriverRegistry::with_defaults()),
            sink: Arc::new(TracingSink),
            schema_cache: Arc::new(SchemaCache::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = Arc::new(drivers);
        self
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn sink(&self) -> &dyn ErrorSink {
        self.sink.as_ref()
    }

    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.schema_cache
    }

    /// Hand an error to the sink
    pub fn report(&self, error: &BudexError) {
        self.sink.fail(error);
    }
}

impl Default for DataContext {
    fn default() -> Self {
        Self::new(DataConfig::default())
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("data_dir", &self.config.data_dir())
            .field("drivers", &self.drivers.list())
            .finish_non_exhaustive()
    }
}
