//! Retry policy: decides whether a failed job goes around again, and after
//! how long.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ConfigError;

/// How the delay before redelivery grows with the retry count.
///
/// Serializes lowercase. Deserializes through `FromStr`, so options files
/// accept the same spellings as the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Every retry waits the base delay.
    #[default]
    Linear,

    /// Retry `n` waits `base * 2^(n - 1)`.
    Exponential,
}

impl Backoff {
    /// Delay before redelivering a job whose attempt number `retry_count`
    /// (1-based) just failed.
    ///
    /// No jitter and no cap. Exponential growth saturates at `Duration::MAX`
    /// rather than overflowing; a `retry_count` of 0 is treated like 1.
    pub fn delay_for(self, retry_count: u32, base_delay: Duration) -> Duration {
        match self {
            Backoff::Linear => base_delay,
            Backoff::Exponential => {
                if base_delay.is_zero() {
                    return Duration::ZERO;
                }
                2u32.checked_pow(retry_count.saturating_sub(1))
                    .and_then(|factor| base_delay.checked_mul(factor))
                    .unwrap_or(Duration::MAX)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backoff::Linear => "linear",
            Backoff::Exponential => "exponential",
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backoff {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Backoff::Linear),
            "exponential" => Ok(Backoff::Exponential),
            other => Err(ConfigError::UnknownBackoff(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Backoff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What to do with a job whose handler just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then put the job at the back of the store.
    Retry { delay: Duration },

    /// Retries exhausted; the job is terminally failed.
    GiveUp,
}

/// Retry bound and backoff, snapshotted into every job at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff,
        }
    }

    pub fn next_delay(&self, retry_count: u32) -> Duration {
        self.backoff.delay_for(retry_count, self.base_delay)
    }

    /// Decide based on the failure count *after* the latest failure was
    /// counted. A job may fail `max_retries + 1` times in total.
    pub fn decide(&self, retries: u32) -> RetryDecision {
        if retries <= self.max_retries {
            RetryDecision::Retry {
                delay: self.next_delay(retries),
            }
        } else {
            RetryDecision::GiveUp
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Backoff::Linear)
    }
}
