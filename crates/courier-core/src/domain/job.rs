//! Job record: one unit of enqueued work plus its delivery bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::HandlerError;
use super::ids::JobId;
use super::state::JobStatus;
use crate::queue::{RetryDecision, RetryPolicy};

/// A published job.
///
/// Design:
/// - Owned by the store while queued, and by the drain loop while dispatched.
/// - The retry policy is copied in at publish time; later option changes never
///   reach jobs already in flight.
/// - All state transitions happen through the methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub topic: String,
    pub payload: serde_json::Value,

    /// Failed attempts so far.
    pub retries: u32,

    pub status: JobStatus,

    /// Cause of the most recent failure, if any attempt has failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<HandlerError>,

    policy: RetryPolicy,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value, policy: RetryPolicy) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            topic: topic.into(),
            payload,
            retries: 0,
            status: JobStatus::Pending,
            last_error: None,
            policy,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.policy.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.policy.base_delay
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Mark as handed to a handler.
    pub fn start_processing(&mut self) {
        self.set_status(JobStatus::Processing);
    }

    pub fn mark_completed(&mut self) {
        self.set_status(JobStatus::Completed);
    }

    /// Count a failed attempt and decide what happens next.
    ///
    /// Leaves the job `Retrying` when another attempt is allowed, `Failed`
    /// otherwise.
    pub fn record_failure(&mut self, error: HandlerError) -> RetryDecision {
        self.retries = self.retries.saturating_add(1);
        self.last_error = Some(error);

        let decision = self.policy.decide(self.retries);
        match decision {
            RetryDecision::Retry { .. } => self.set_status(JobStatus::Retrying),
            RetryDecision::GiveUp => self.set_status(JobStatus::Failed),
        }
        decision
    }

    /// Back to the store after the backoff window.
    pub fn requeue(&mut self) {
        self.set_status(JobStatus::Pending);
    }

    fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
