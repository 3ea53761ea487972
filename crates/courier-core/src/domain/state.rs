//! Job status machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a job as it moves through the drain loop.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Retrying -> Pending (loop while retries <= max_retries)
/// - Pending -> Processing -> Failed (retries exhausted)
///
/// A job whose topic has no handler is dropped while `Processing`; that
/// outcome is reported as an event and never recorded as a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the store.
    Pending,

    /// Popped and handed to its handler.
    Processing,

    /// Failed an attempt; the drain is waiting out the backoff delay.
    Retrying,

    /// Retries exhausted.
    Failed,

    /// Handler succeeded.
    Completed,
}

impl JobStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Retrying => "retrying",
            JobStatus::Failed => "failed",
            JobStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
