//! Queue module: job store, retry policy, and the drain loop.

mod drain;
mod retry;
mod store;

pub(crate) use drain::Shared;
pub use retry::{Backoff, RetryDecision, RetryPolicy};
pub use store::JobStore;
