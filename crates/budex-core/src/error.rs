//! Error types for budex

use thiserror::Error;

/// Core error type for data-access operations
#[derive(Error, Debug)]
pub enum BudexError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for BudexError {
    fn from(err: toml::de::Error) -> Self {
        BudexError::Configuration(err.to_string())
    }
}

/// Result type alias for budex operations
pub type Result<T> = std::result::Result<T, BudexError>;
