//! Monitoring surface: queue stats and the event sink the drain loop reports to.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::QueueEvent;

/// Snapshot returned by `MessageQueue::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs still waiting in the store. A job sleeping out its backoff delay
    /// is held by the drain loop and is not counted.
    pub queue_length: usize,

    /// Topics with a registered handler, sorted.
    pub topics: Vec<String>,
}

/// Receives every lifecycle event the queue produces.
///
/// Called inline from the drain loop, so implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &QueueEvent);
}

/// Default sink: reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &QueueEvent) {
        match event {
            QueueEvent::Published { job_id, topic } => {
                debug!(job_id = %job_id, topic = %topic, "job published");
            }
            QueueEvent::Completed { job } => {
                info!(
                    job_id = %job.id,
                    topic = %job.topic,
                    retries = job.retries,
                    "job completed"
                );
            }
            QueueEvent::RetryScheduled { job, delay } => {
                warn!(
                    job_id = %job.id,
                    topic = %job.topic,
                    retries = job.retries,
                    max_retries = job.max_retries(),
                    delay_ms = delay.as_millis() as u64,
                    error = ?job.last_error,
                    "job failed, retry scheduled"
                );
            }
            QueueEvent::NoHandler { job } => {
                warn!(job_id = %job.id, topic = %job.topic, "no handler for topic, job dropped");
            }
            QueueEvent::Failed { job } => {
                error!(
                    job_id = %job.id,
                    topic = %job.topic,
                    retries = job.retries,
                    max_retries = job.max_retries(),
                    error = ?job.last_error,
                    "job failed permanently"
                );
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in order, handy for asserting on a whole lifecycle.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(QueueEvent::name)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &QueueEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
