//! MessageQueue - the publish/subscribe/stats surface.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use super::builder::QueueBuilder;
use crate::config::QueueOptions;
use crate::domain::{HandlerError, Job, JobId};
use crate::observability::{EventSink, QueueStats, TracingSink};
use crate::queue::Shared;
use crate::typed::{FnHandler, Handler, HandlerRegistry, Message, MessageHandler, TypedHandler};

/// Error from `MessageQueue::publish_message`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode message for topic '{topic}': {source}")]
    Encode {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// In-process topic queue with retry and backoff.
///
/// # Example
/// ```ignore
/// let queue = MessageQueue::new(QueueOptions::default().with_retry(3));
///
/// queue.subscribe("user.save", |payload| async move {
///     save_user(payload).await.map_err(HandlerError::from_error)
/// });
///
/// queue.publish("user.save", json!({ "name": "ram" }));
/// ```
///
/// Cloning is cheap and every clone drives the same store, registry and drain
/// task. Separate `MessageQueue::new` calls are fully independent.
///
/// `publish` must be called from within a Tokio runtime for the drain task to
/// start; outside one, jobs wait in the store until the next publish that is.
#[derive(Clone)]
pub struct MessageQueue {
    shared: Arc<Shared>,
}

impl MessageQueue {
    /// Queue reporting lifecycle events through `tracing`.
    pub fn new(options: QueueOptions) -> Self {
        Self::with_parts(options, HandlerRegistry::new(), Arc::new(TracingSink))
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub(crate) fn with_parts(
        options: QueueOptions,
        registry: HandlerRegistry,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(options, registry, sink)),
        }
    }

    /// Enqueue `payload` under `topic` and return immediately.
    ///
    /// Never fails and never waits for processing. The returned id matches
    /// the `job_id` of every event reported for this job.
    pub fn publish(&self, topic: impl Into<String>, payload: serde_json::Value) -> JobId {
        let job = Job::new(topic, payload, self.shared.options().retry_policy());
        let id = job.id;
        self.shared.enqueue(job);
        id
    }

    /// Encode `message` and publish it on `M::TOPIC`.
    pub fn publish_message<M: Message>(&self, message: &M) -> Result<JobId, PublishError> {
        let payload = serde_json::to_value(message).map_err(|source| PublishError::Encode {
            topic: M::TOPIC,
            source,
        })?;
        Ok(self.publish(M::TOPIC, payload))
    }

    /// Register an async closure for `topic`, replacing any previous handler.
    pub fn subscribe<F, Fut>(&self, topic: impl Into<String>, f: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe_handler(topic, FnHandler::new(f));
    }

    pub fn subscribe_handler<H: Handler + 'static>(&self, topic: impl Into<String>, handler: H) {
        let topic = topic.into();
        let replaced = self
            .shared
            .registry_mut()
            .register(topic.clone(), Arc::new(handler));
        if replaced.is_some() {
            tracing::debug!(topic = %topic, "handler replaced");
        }
    }

    /// Register a typed handler on `M::TOPIC`.
    pub fn subscribe_message<M, H>(&self, handler: H)
    where
        M: Message,
        H: MessageHandler<M> + 'static,
    {
        self.subscribe_handler(M::TOPIC, TypedHandler::<M, H>::new(handler));
    }

    /// Remove the handler for `topic`. Jobs still queued for it are dropped as
    /// unhandled when their turn comes. Returns whether a handler existed.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.shared.registry_mut().remove(topic).is_some()
    }

    pub fn stats(&self) -> QueueStats {
        let queue_length = self.queue_length();
        QueueStats {
            queue_length,
            topics: self.shared.registry().topics(),
        }
    }

    pub fn queue_length(&self) -> usize {
        self.shared.store().len()
    }

    pub fn options(&self) -> &QueueOptions {
        self.shared.options()
    }

    /// Whether a drain pass is currently running.
    pub fn is_draining(&self) -> bool {
        self.shared.is_draining()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(QueueOptions::default())
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("options", self.options())
            .field("stats", &self.stats())
            .field("draining", &self.is_draining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueEvent;
    use crate::observability::RecordingSink;
    use crate::typed::message::fixtures::Ping;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn queue_with_sink(options: QueueOptions) -> (MessageQueue, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let queue = MessageQueue::with_parts(options, HandlerRegistry::new(), sink.clone());
        (queue, sink)
    }

    async fn settle(queue: &MessageQueue) {
        while queue.is_draining() || queue.queue_length() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publish_returns_before_processing() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        queue.subscribe("slow", |_| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        });

        queue.publish("slow", json!({}));
        assert_eq!(queue.queue_length(), 1);
        assert!(queue.is_draining());

        settle(&queue).await;
        assert_eq!(sink.names(), vec!["published", "completed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_report_length_and_sorted_topics() {
        let (queue, _sink) = queue_with_sink(QueueOptions::default());
        queue.subscribe("b", |_| async { Ok(()) });
        queue.subscribe("a", |_| async { Ok(()) });

        queue.publish("a", json!(1));
        queue.publish("b", json!(2));

        let stats = queue.stats();
        assert_eq!(stats.queue_length, 2);
        assert_eq!(stats.topics, vec!["a", "b"]);

        settle(&queue).await;
        assert_eq!(queue.stats().queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_after_publish_makes_job_dispatchable() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));

        queue.publish("late", json!({}));
        let c = calls.clone();
        queue.subscribe("late", move |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        settle(&queue).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.names(), vec!["published", "completed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_replaces_handler() {
        let (queue, _sink) = queue_with_sink(QueueOptions::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        queue.subscribe("t", move |_| {
            let s = s.clone();
            async move {
                s.lock().unwrap().push("first");
                Ok(())
            }
        });
        let s = seen.clone();
        queue.subscribe("t", move |_| {
            let s = s.clone();
            async move {
                s.lock().unwrap().push("second");
                Ok(())
            }
        });

        queue.publish("t", json!({}));
        settle(&queue).await;
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
        assert_eq!(queue.stats().topics, vec!["t"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_topic_jobs_are_dropped() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        queue.subscribe("t", |_| async { Ok(()) });
        assert!(queue.unsubscribe("t"));
        assert!(!queue.unsubscribe("t"));

        queue.publish("t", json!({}));
        settle(&queue).await;
        assert_eq!(sink.names(), vec!["published", "no_handler"]);
        assert!(queue.stats().topics.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_restarts_for_publish_after_idle() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        queue.subscribe("t", |_| async { Ok(()) });

        queue.publish("t", json!(1));
        settle(&queue).await;
        assert!(!queue.is_draining());

        queue.publish("t", json!(2));
        settle(&queue).await;
        assert_eq!(
            sink.names(),
            vec!["published", "completed", "published", "completed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn job_id_matches_reported_events() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        queue.subscribe("t", |_| async { Ok(()) });

        let id = queue.publish("t", json!({}));
        settle(&queue).await;
        assert!(sink.events().iter().all(|e| e.job_id() == id));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_handler_is_retried_then_failed() {
        let (queue, sink) = queue_with_sink(
            QueueOptions::default()
                .with_retry(1)
                .with_delay(Duration::from_millis(5)),
        );
        queue.subscribe("boom", |payload| async move {
            if payload.is_object() {
                panic!("handler exploded");
            }
            Ok(())
        });

        queue.publish("boom", json!({}));
        settle(&queue).await;

        assert_eq!(
            sink.names(),
            vec!["published", "retry_scheduled", "failed"]
        );
        let events = sink.events();
        let Some(QueueEvent::Failed { job }) = events.last() else {
            panic!("expected failed event");
        };
        assert_eq!(
            job.last_error,
            Some(HandlerError::Panicked("handler exploded".to_string()))
        );

        // The drain survived the panics and still serves new work.
        queue.subscribe("ok", |_| async { Ok(()) });
        queue.publish("ok", json!({}));
        settle(&queue).await;
        assert_eq!(sink.names().last(), Some(&"completed"));
    }

    struct CountPings {
        total: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageHandler<Ping> for CountPings {
        async fn handle(&self, message: Ping) -> Result<(), HandlerError> {
            self.total
                .fetch_add(message.value as usize, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn typed_publish_and_subscribe() {
        let (queue, sink) = queue_with_sink(QueueOptions::default());
        let total = Arc::new(AtomicUsize::new(0));
        queue.subscribe_message::<Ping, _>(CountPings {
            total: total.clone(),
        });

        queue.publish_message(&Ping { value: 3 }).unwrap();
        queue.publish_message(&Ping { value: 4 }).unwrap();
        settle(&queue).await;

        assert_eq!(total.load(Ordering::SeqCst), 7);
        assert_eq!(queue.stats().topics, vec![Ping::TOPIC]);
        assert_eq!(sink.names().iter().filter(|n| **n == "completed").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_payload_fails_like_handler_error() {
        let (queue, sink) = queue_with_sink(QueueOptions::default().with_retry(0));
        queue.subscribe_message::<Ping, _>(CountPings {
            total: Arc::new(AtomicUsize::new(0)),
        });

        queue.publish(Ping::TOPIC, json!({ "value": "three" }));
        settle(&queue).await;

        let events = sink.events();
        let Some(QueueEvent::Failed { job }) = events.last() else {
            panic!("expected failed event");
        };
        assert!(matches!(job.last_error, Some(HandlerError::Decode(_))));
    }

    #[test]
    fn default_queue_uses_default_options() {
        let queue = MessageQueue::default();
        assert_eq!(*queue.options(), QueueOptions::default());
        assert!(!queue.is_draining());
        assert_eq!(queue.stats(), QueueStats::default());
    }
}
