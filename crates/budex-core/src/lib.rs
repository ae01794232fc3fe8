//! budex core - shared abstractions for the budget-execution data layer
//!
//! This crate holds everything the engines and the data-access pipeline agree on:
//!
//! - `Provider` / `Source` - the static registry of backends and logical datasets
//! - `DataConfig` - provider-keyed connection-string templates loaded at startup
//! - `DatabaseDriver` / `Connection` / `SchemaIntrospection` - the engine seam
//! - `ErrorSink` - the observable side of the "report and return empty" policy
//! - Common types like `Value`, `Row`, `ColumnMeta` and `QueryResult`

mod config;
mod connection;
mod connection_string;
mod driver;
mod error;
mod provider;
mod schema;
mod sink;
mod source;
mod types;

pub use config::*;
pub use connection::*;
pub use connection_string::*;
pub use driver::*;
pub use error::*;
pub use provider::*;
pub use schema::*;
pub use sink::*;
pub use source::*;
pub use types::*;
