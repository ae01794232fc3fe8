//! MS SQL Server engine for budex
//!
//! Connections are opened from ADO.NET-style connection strings
//! (`Server=tcp:host,1433;Database=...;User Id=...;Password=...;`).

mod connection;
mod driver;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod driver_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use driver::MssqlDriver;
