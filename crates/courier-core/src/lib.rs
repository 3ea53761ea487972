//! courier-core
//!
//! In-process topic queue with retry and backoff.
//!
//! # Modules
//! - **domain**: job record, status machine, ids, handler errors, events
//! - **queue**: FIFO job store, retry policy, the drain loop
//! - **typed**: handler traits (untyped and `Message`-typed) and the registry
//! - **app**: `MessageQueue` facade and `QueueBuilder`
//! - **config**: `QueueOptions`
//! - **observability**: `QueueStats` and the `EventSink` monitoring seam

pub mod app;
pub mod config;
pub mod domain;
pub mod observability;
pub mod queue;
pub mod typed;

pub use app::{BuildError, MessageQueue, PublishError, QueueBuilder};
pub use config::{ConfigError, QueueOptions};
pub use domain::{HandlerError, Job, JobId, JobStatus, QueueEvent};
pub use observability::{EventSink, QueueStats, RecordingSink, TracingSink};
pub use queue::{Backoff, RetryPolicy};
pub use typed::{Handler, Message, MessageHandler};
