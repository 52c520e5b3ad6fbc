//! State error types

use thiserror::Error;

/// Errors raised by the state store and its storage backends
#[derive(Error, Debug)]
pub enum StateError {
    /// Path string could not be parsed into segments
    #[error("Invalid state path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// An intermediate segment exists but holds a non-map value
    #[error("Cannot write '{path}': segment '{segment}' is not a mapping")]
    PathConflict { path: String, segment: String },

    /// Value cannot be stored at the path
    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    /// Serialized state could not be parsed
    #[error("Failed to deserialize state: {0}")]
    Deserialization(String),

    /// State could not be serialized
    #[error("Failed to serialize state: {0}")]
    Serialization(String),

    /// Durable storage rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for StateError {
    fn from(err: std::io::Error) -> Self {
        StateError::Storage(err.to_string())
    }
}

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;
