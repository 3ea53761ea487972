//! Handler failure causes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a handler attempt failed.
///
/// Every variant is recoverable from the queue's point of view: the drain
/// loop records it on the job and retries until the bound is reached.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The payload could not be decoded into the handler's message type.
    #[error("payload decode: {0}")]
    Decode(String),

    /// The handler panicked while running.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap any error as a handler failure, keeping its message.
    pub fn from_error(err: impl std::error::Error) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}
