//! The drain loop: one logical worker per queue instance.
//!
//! # Flow
//! 1. `enqueue` reports the job, appends it to the store and starts a drain
//!    task if none is active
//! 2. the drain pops the front job and marks it processing
//! 3. no handler for the topic: drop the job, report it, continue
//! 4. handler succeeds: mark completed, discard
//! 5. handler fails: count the failure, then either sleep out the backoff
//!    delay and append the job to the back, or mark it failed and discard
//! 6. store empty: release the guard and exit
//!
//! Handler execution and the backoff sleep both suspend the whole drain; no
//! other job is dispatched meanwhile, across all topics.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::runtime::Handle;
use tracing::{debug, error};

use super::retry::RetryDecision;
use super::store::JobStore;
use crate::config::QueueOptions;
use crate::domain::{HandlerError, Job, QueueEvent};
use crate::observability::EventSink;
use crate::typed::{Handler, HandlerRegistry};

/// State owned by one queue instance and shared with its drain task.
///
/// Locks are only ever held for a single store or registry operation, never
/// across an `.await`.
pub(crate) struct Shared {
    store: Mutex<JobStore>,
    registry: RwLock<HandlerRegistry>,
    draining: AtomicBool,
    options: QueueOptions,
    sink: Arc<dyn EventSink>,
}

impl Shared {
    pub(crate) fn new(
        options: QueueOptions,
        registry: HandlerRegistry,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store: Mutex::new(JobStore::new()),
            registry: RwLock::new(registry),
            draining: AtomicBool::new(false),
            options,
            sink,
        }
    }

    pub(crate) fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub(crate) fn store(&self) -> MutexGuard<'_, JobStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn registry(&self) -> RwLockReadGuard<'_, HandlerRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn registry_mut(&self) -> RwLockWriteGuard<'_, HandlerRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Append `job` and make sure a drain pass will pick it up.
    pub(crate) fn enqueue(self: &Arc<Self>, job: Job) {
        let event = QueueEvent::Published {
            job_id: job.id,
            topic: job.topic.clone(),
        };
        // Reported before the append: once stored, a drain on another worker
        // can complete the job.
        self.sink.emit(&event);
        self.store().append(job);
        self.ensure_draining();
    }

    /// Spawn a drain task unless one is already running.
    fn ensure_draining(self: &Arc<Self>) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Arc::clone(self).drain());
            }
            Err(err) => {
                // Leave the job queued; the next publish from inside a
                // runtime starts the drain.
                self.draining.store(false, Ordering::Release);
                error!(error = %err, "publish called outside a Tokio runtime, drain not started");
            }
        }
    }

    async fn drain(self: Arc<Self>) {
        let mut guard = DrainGuard::new(&self.draining);
        debug!("drain pass started");

        loop {
            let job = {
                let mut store = self.store();
                match store.pop_front() {
                    Some(job) => job,
                    None => {
                        // Released under the store lock: a concurrent
                        // publish either lands before this check or sees
                        // the flag cleared and spawns a new drain.
                        guard.release();
                        break;
                    }
                }
            };
            self.process(job).await;
        }

        debug!("drain pass finished");
    }

    async fn process(&self, mut job: Job) {
        job.start_processing();

        let handler = self.registry().get(&job.topic);
        let Some(handler) = handler else {
            self.sink.emit(&QueueEvent::NoHandler { job });
            return;
        };

        match invoke(handler, job.payload.clone()).await {
            Ok(()) => {
                job.mark_completed();
                self.sink.emit(&QueueEvent::Completed { job });
            }
            Err(err) => match job.record_failure(err) {
                RetryDecision::Retry { delay } => {
                    self.sink.emit(&QueueEvent::RetryScheduled {
                        job: job.clone(),
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                    job.requeue();
                    self.store().append(job);
                }
                RetryDecision::GiveUp => {
                    self.sink.emit(&QueueEvent::Failed { job });
                }
            },
        }
    }
}

/// Run the handler in its own task so a panic fails the attempt instead of
/// killing the drain.
async fn invoke(handler: Arc<dyn Handler>, payload: serde_json::Value) -> Result<(), HandlerError> {
    let task = tokio::spawn(async move { handler.handle(payload).await });
    match task.await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(HandlerError::Panicked(panic_message(err.into_panic()))),
        Err(err) => Err(HandlerError::failed(format!("handler task cancelled: {err}"))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Clears the draining flag if the drain task unwinds, so a later publish
/// can start a fresh pass.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
    armed: bool,
}

impl<'a> DrainGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        Self { flag, armed: true }
    }

    fn release(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.armed = false;
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(false, Ordering::Release);
        }
    }
}
