//! Domain model (ids, job record, status, handler errors, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod job;
pub mod state;

pub use errors::HandlerError;
pub use events::QueueEvent;
pub use ids::JobId;
pub use job::Job;
pub use state::JobStatus;
