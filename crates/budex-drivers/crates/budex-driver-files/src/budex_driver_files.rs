//! Flat-file engine
//!
//! CSV files and Excel workbooks have no query engine of their own. On connect
//! the requested table is read once and loaded into a private in-memory SQLite
//! database, which then answers the same SQL the other engines get. Staged
//! data is read-only.

mod connection;
mod driver;
mod staging;

#[cfg(test)]
mod staging_tests;

pub use connection::FileConnection;
pub use driver::FileDriver;
pub use staging::{FileStagingError, StagedColumn, StagedTable, stage_csv, stage_excel};
