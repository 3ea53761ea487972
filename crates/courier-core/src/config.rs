//! Queue configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{Backoff, RetryPolicy};

/// Options read once when a queue is constructed.
///
/// Every field is optional in serialized form:
///
/// ```json
/// { "retry": 3, "delay": 1000, "backoff": "linear" }
/// ```
///
/// `delay` is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueOptions {
    /// How many times a failed job is redelivered before it is marked failed.
    pub retry: u32,

    /// Base delay in milliseconds before redelivery.
    #[serde(rename = "delay")]
    pub delay_ms: u64,

    pub backoff: Backoff,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            retry: 3,
            delay_ms: 1000,
            backoff: Backoff::Linear,
        }
    }
}

impl QueueOptions {
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// The policy each newly published job snapshots.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry, self.delay(), self.backoff)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid queue options: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read queue options: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown backoff strategy '{0}' (expected 'linear' or 'exponential')")]
    UnknownBackoff(String),
}
