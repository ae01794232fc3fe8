//! SQLite engine implementation
//!
//! Also serves as the query engine behind staged flat files, which is why the
//! connection exposes bulk loading next to the `Connection` trait.

mod connection;
mod driver;

#[cfg(test)]
mod connection_tests;

pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
