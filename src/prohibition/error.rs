use thiserror::Error;

use crate::prohibition::types::{ConsumerId, SubscriptionMode};

/// Result type for prohibition controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the consumption prohibition controller
///
/// None of these ever crosses a lifecycle hook boundary; they are logged
/// where the hook catches them.
#[derive(Debug, Error)]
pub enum Error {
    /// An outbound call to the underlying consumer client failed
    #[error("Broker error during {operation}: {message}")]
    BrokerError {
        operation: &'static str,
        message: String,
    },

    /// Validation error - a consumer could not be wrapped or an argument was malformed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// SUBSCRIBE and ASSIGN were mixed on one consumer
    #[error("Consumer {consumer} is in {current} mode and cannot switch to {requested}")]
    ModeConflict {
        consumer: ConsumerId,
        current: SubscriptionMode,
        requested: SubscriptionMode,
    },

    /// A policy document could not be parsed
    #[error("Policy error: {0}")]
    PolicyError(String),

    /// Invalid controller configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Build a broker error for the named client operation
    pub fn broker(operation: &'static str, message: impl Into<String>) -> Self {
        Error::BrokerError {
            operation,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::PolicyError(err.to_string())
    }
}
