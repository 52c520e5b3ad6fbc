//! Asset error types

use thiserror::Error;

/// Errors raised while resolving or loading assets
///
/// Cloneable so that every caller coalesced onto one in-flight load observes
/// the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No loader is registered for the file extension
    #[error("Unsupported asset format: {0}")]
    UnsupportedFormat(String),

    /// The loader rejected the asset
    #[error("Failed to load '{path}': {reason}")]
    LoadFailure { path: String, reason: String },

    /// The asset does not exist at the resolved location
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The request itself is malformed (empty path, unknown category)
    #[error("Invalid asset request: {0}")]
    InvalidRequest(String),

    /// The loader dropped its callbacks without reporting an outcome
    #[error("Load of '{0}' was abandoned by its loader")]
    Cancelled(String),
}

impl AssetError {
    pub fn load_failure(path: impl Into<String>, reason: impl ToString) -> Self {
        AssetError::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
