//! Collaborator seams - where pool state, settings, and transfers come from
//!
//! The distribution engine performs no I/O itself. Everything it reads or
//! sends goes through the traits in this module:
//! - PoolSource: live pool size, caller identity, raw recipient list
//! - SettingsSource: account-level disable flags and time windows
//! - TransferSender: the only effectful operation
//!
//! Two implementations ship with the crate: `HttpTransferApi` for a JSON HTTP
//! backend, and `MemoryBackend` for tests and dry runs.

pub mod http;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{PoolSnapshot, RecipientSettings};

pub use http::{HttpApiConfig, HttpTransferApi};
pub use memory::{MemoryBackend, ScriptedReply, SentTransfer};

/// Source of the live pool and recipient list
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pool_and_recipients(&self) -> Result<PoolSnapshot, SourceError>;
}

/// Source of per-recipient account settings
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch_recipient_settings(&self) -> Result<HashMap<String, RecipientSettings>, SourceError>;
}

/// Issues a single transfer to a recipient
#[async_trait]
pub trait TransferSender: Send + Sync {
    /// `Ok` carries the remote verdict; `Err` means no structured verdict arrived
    async fn send(&self, recipient_id: &str, amount: u64) -> Result<TransferOutcome, SourceError>;
}

/// Remote verdict for one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Units actually credited to the recipient
    Delivered { amount: u64 },
    /// The remote side refused with a structured error code
    Rejected { code: String },
}

impl TransferOutcome {
    pub fn rejected(code: impl Into<String>) -> Self {
        TransferOutcome::Rejected { code: code.into() }
    }
}

/// Errors that can occur while talking to a collaborator
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Network(_) => true,
            SourceError::Api { status, .. } => *status >= 500,
            SourceError::InvalidResponse(_) => false,
            SourceError::Json(_) => false,
            SourceError::Unavailable(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_is_retryable() {
        assert!(
            SourceError::Api {
                status: 503,
                message: "maintenance".to_string()
            }
            .is_retryable()
        );

        assert!(
            !SourceError::Api {
                status: 400,
                message: "bad request".to_string()
            }
            .is_retryable()
        );

        assert!(SourceError::Unavailable("offline".to_string()).is_retryable());
        assert!(!SourceError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error 502: bad gateway");
    }

    #[test]
    fn test_transfer_outcome_rejected() {
        assert_eq!(
            TransferOutcome::rejected("no_data"),
            TransferOutcome::Rejected {
                code: "no_data".to_string()
            }
        );
    }
}
