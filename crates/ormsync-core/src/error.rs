//! Error types for ormsync

use thiserror::Error;

/// Core error type for database operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Message suitable for an error list, without the variant prefix
    pub fn message(&self) -> String {
        match self {
            DbError::Connection(m)
            | DbError::Query(m)
            | DbError::Schema(m)
            | DbError::Configuration(m)
            | DbError::NotSupported(m)
            | DbError::NotFound(m)
            | DbError::Other(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;
