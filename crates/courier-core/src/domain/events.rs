//! Lifecycle events emitted by the queue.

use std::time::Duration;

use serde::Serialize;

use super::ids::JobId;
use super::job::Job;

/// Something observable that happened to a job.
///
/// Terminal and retry events carry a snapshot of the job, so a monitor can
/// inspect `retries` and `last_error` after the queue has let go of it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// The job was appended to the store.
    Published { job_id: JobId, topic: String },

    /// The handler succeeded.
    Completed { job: Job },

    /// The handler failed and the job will be redelivered after `delay`.
    RetryScheduled { job: Job, delay: Duration },

    /// No handler was registered for the topic; the job was dropped.
    NoHandler { job: Job },

    /// Retries exhausted; the job was dropped as failed.
    Failed { job: Job },
}

impl QueueEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            QueueEvent::Published { job_id, .. } => *job_id,
            QueueEvent::Completed { job }
            | QueueEvent::RetryScheduled { job, .. }
            | QueueEvent::NoHandler { job }
            | QueueEvent::Failed { job } => job.id,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            QueueEvent::Published { topic, .. } => topic,
            QueueEvent::Completed { job }
            | QueueEvent::RetryScheduled { job, .. }
            | QueueEvent::NoHandler { job }
            | QueueEvent::Failed { job } => &job.topic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Published { .. } => "published",
            QueueEvent::Completed { .. } => "completed",
            QueueEvent::RetryScheduled { .. } => "retry_scheduled",
            QueueEvent::NoHandler { .. } => "no_handler",
            QueueEvent::Failed { .. } => "failed",
        }
    }
}
