//! Error types for the shared store layer

use std::fmt;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection to the backend failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Create a connection error
    pub fn connection<E: fmt::Display>(err: E) -> Self {
        Self::Connection(err.to_string())
    }

    /// Create an I/O error
    pub fn io<E: fmt::Display>(err: E) -> Self {
        Self::Io(err.to_string())
    }

    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(err: E) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}
