//! Store error types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Transport or backend failure; never retried by this crate
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Stored document does not match the expected shape
    #[error("Decode error at {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Listener fell behind the change stream and skipped events
    #[error("Listener lagged, {0} events skipped")]
    ListenerLagged(u64),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
