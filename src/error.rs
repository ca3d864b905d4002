//! Error types for versioned objects.

use crate::subscriptions::SubscriptionId;
use thiserror::Error;

/// Main error type for history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Constructor input was present but not a plain object.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Merge/replace data was not a plain object, or a delete key was not a scalar.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Options were not an object, or a limit/window was not a natural number.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Store binding key was empty or blank.
    #[error("Invalid store binding: {0}")]
    InvalidStoreBinding(String),

    /// An observer rejected a change event. The entry was already committed.
    #[error("Observer {id:?} failed: {message}")]
    Observer { id: SubscriptionId, message: String },

    /// JSON encoding or decoding of a history failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Serialization(e.to_string())
    }
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
