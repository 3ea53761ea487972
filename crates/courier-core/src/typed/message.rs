//! Message trait - topic 名と payload 型を結びつける

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A payload type that always travels on one topic.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SaveUser {
///     name: String,
/// }
///
/// impl Message for SaveUser {
///     const TOPIC: &'static str = "user.save";
/// }
/// ```
///
/// The bounds let the queue encode the message into a JSON payload on
/// publish, decode it again on delivery, and hold handlers behind `Arc`.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Topic name. Suggested shape: `{domain}.{action}`, e.g. `user.save`.
    const TOPIC: &'static str;
}
