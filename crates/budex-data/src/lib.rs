//! budex data - the provider-agnostic data-access pipeline
//!
//! This crate turns a logical `(Source, Provider, filter arguments)` triple into
//! an in-memory table. Every stage is a plain value handed to the next one.
//!
//! # Architecture
//!
//! ```text
//! DataBuilder            ← entities read records and program elements here
//!     ↓
//! Query                  ← one session: connection + commands + adapter
//!     ↓
//! AdapterFactory / CommandBuilder
//!     ↓
//! SqlStatement           ← parameterized SQL for one table
//!     ↓
//! ConnectionFactory      ← unopened connection, driver chosen by Engine
//!     ↓
//! ConnectionBuilder      ← resolved descriptor from the injected DataConfig
//! ```
//!
//! # Failure policy
//!
//! Every stage has a `try_*` constructor returning [`Result`]. The plain
//! constructors report the error to the context's [`ErrorSink`] and return
//! `None` or an empty value instead, so callers only ever see "empty".

mod adapter;
mod builder;
mod command;
mod connection_builder;
mod connection_factory;
mod context;
mod query;
mod reader;
mod schema_cache;
mod statement;
mod table;

pub use adapter::{
    AdapterBuilder, AdapterFactory, AdapterKind, AdapterOptions, DataAdapter,
    MissingMappingAction, MissingSchemaAction,
};
pub use builder::{DataBuilder, FromRecord};
pub use command::{CommandBehavior, CommandBuilder, CommandFactory, DbCommand};
pub use connection_builder::ConnectionBuilder;
pub use connection_factory::{ConnectionFactory, ConnectionState, DataConnection};
pub use context::DataContext;
pub use query::{Query, QueryState};
pub use reader::DataReader;
pub use schema_cache::SchemaCache;
pub use statement::{CommandType, FilterArgs, SqlStatement};
pub use table::{DataColumn, DataRow, DataTable, RowState, caption_for};

pub use budex_core::{
    BudexError, CollectingSink, ColumnKind, DataConfig, Engine, ErrorSink, Provider, Result,
    ResultExt, Source, TracingSink, Value,
};

#[cfg(test)]
mod table_tests;
