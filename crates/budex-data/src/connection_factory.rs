//! Provider-specific, unopened connections

use budex_core::{
    Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Engine, Result, ResultExt,
};
use budex_drivers::block_on_tokio;
use parking_lot::Mutex;
use std::sync::Arc;
use strum::Display;

use crate::{ConnectionBuilder, DataContext};

/// Whether a [`DataConnection`] currently holds an open engine connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// Handle to a connection that is opened on demand.
///
/// Clones share the same underlying connection, so a reader can close the
/// connection its query opened.
#[derive(Clone)]
pub struct DataConnection {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    engine: Engine,
    slot: Arc<Mutex<Option<Arc<dyn Connection>>>>,
}

impl DataConnection {
    fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig, engine: Engine) -> Self {
        Self {
            driver,
            config,
            engine,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn capabilities(&self) -> DriverCapabilities {
        self.driver.capabilities()
    }

    pub fn state(&self) -> ConnectionState {
        match self.slot.lock().as_ref() {
            Some(conn) if !conn.is_closed() => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    /// Open the connection. Opening an open connection is a no-op.
    pub fn open(&self) -> Result<()> {
        self.connection().map(|_| ())
    }

    /// The engine connection, opened first if necessary
    pub fn connection(&self) -> Result<Arc<dyn Connection>> {
        let mut slot = self.slot.lock();
        if let Some(conn) = slot.as_ref().filter(|c| !c.is_closed()) {
            return Ok(conn.clone());
        }

        tracing::debug!(id = %self.config.id, engine = %self.engine, "opening connection");
        let conn = block_on_tokio(self.driver.connect(&self.config))?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Close the connection. Closing a closed connection is a no-op.
    pub fn close(&self) -> Result<()> {
        let conn = self.slot.lock().take();
        match conn {
            Some(conn) if !conn.is_closed() => {
                tracing::debug!(id = %self.config.id, engine = %self.engine, "closing connection");
                block_on_tokio(conn.close())
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for DataConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConnection")
            .field("id", &self.config.id)
            .field("driver", &self.driver.id())
            .field("engine", &self.engine)
            .field("state", &self.state())
            .finish()
    }
}

/// Chooses the driver for a descriptor's engine and hands out unopened
/// connections for it.
pub struct ConnectionFactory {
    builder: ConnectionBuilder,
    driver: Arc<dyn DatabaseDriver>,
}

impl ConnectionFactory {
    pub fn new(ctx: &DataContext, builder: &ConnectionBuilder) -> Result<Self> {
        let engine = builder.engine();
        let driver = ctx.drivers().for_engine(engine)?;
        tracing::debug!(
            provider = %builder.provider(),
            engine = %engine,
            driver = %driver.id(),
            "selected driver"
        );

        Ok(Self {
            builder: builder.clone(),
            driver,
        })
    }

    /// Like [`Self::new`], reporting failures to the context's sink
    pub fn create(ctx: &DataContext, builder: &ConnectionBuilder) -> Option<Self> {
        Self::new(ctx, builder).or_report(ctx.sink())
    }

    pub fn connection_builder(&self) -> &ConnectionBuilder {
        &self.builder
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// A new, unopened connection
    pub fn get_connection(&self) -> DataConnection {
        DataConnection::new(
            self.driver.clone(),
            self.builder.connection_config(),
            self.builder.engine(),
        )
    }
}
