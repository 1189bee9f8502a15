//! Error types for dripfeed
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::sources::SourceError;

/// All error types that can occur in dripfeed
#[derive(Debug, Error)]
pub enum DripfeedError {
    /// A collaborator (pool, settings, transfer) failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for dripfeed operations
pub type Result<T> = std::result::Result<T, DripfeedError>;
