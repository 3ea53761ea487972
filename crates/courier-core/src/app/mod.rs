//! App - the queue facade and its builder.

pub mod builder;
pub mod queue;

pub use self::builder::{BuildError, QueueBuilder};
pub use self::queue::{MessageQueue, PublishError};
