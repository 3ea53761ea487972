//! QueueBuilder - options、Handler、EventSink のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: `expect_topics` の topic は `build` 時点で
//!   Handler が必要
//! - JSON options のパースエラーも最初の publish ではなく `build` で返す

use std::future::Future;
use std::sync::Arc;

use super::queue::MessageQueue;
use crate::config::{ConfigError, QueueOptions};
use crate::domain::HandlerError;
use crate::observability::{EventSink, TracingSink};
use crate::typed::{FnHandler, Handler, HandlerRegistry, Message, MessageHandler, TypedHandler};

/// QueueBuilder は `MessageQueue` を構築
///
/// # 使用例
/// ```ignore
/// let queue = MessageQueue::builder()
///     .options(QueueOptions::default().with_backoff(Backoff::Exponential))
///     .subscribe_message::<SaveUser, _>(SaveUserHandler)
///     .expect_topics(&["user.save"])
///     .build()?;
/// ```
pub struct QueueBuilder {
    options: QueueOptions,
    options_error: Option<ConfigError>,
    registry: HandlerRegistry,
    sink: Arc<dyn EventSink>,
    expected_topics: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers for topics: {0:?}. These topics were expected but not subscribed.")]
    MissingTopics(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self {
            options: QueueOptions::default(),
            options_error: None,
            registry: HandlerRegistry::new(),
            sink: Arc::new(TracingSink),
            expected_topics: Vec::new(),
        }
    }

    pub fn options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self.options_error = None;
        self
    }

    /// Parse options from JSON; a parse error is reported by `build`.
    pub fn options_json(mut self, text: &str) -> Self {
        match QueueOptions::from_json(text) {
            Ok(options) => return self.options(options),
            Err(err) => self.options_error = Some(err),
        }
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn subscribe<F, Fut>(self, topic: impl Into<String>, f: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe_handler(topic, FnHandler::new(f))
    }

    pub fn subscribe_handler<H: Handler + 'static>(
        mut self,
        topic: impl Into<String>,
        handler: H,
    ) -> Self {
        self.registry.register(topic, Arc::new(handler));
        self
    }

    pub fn subscribe_message<M, H>(self, handler: H) -> Self
    where
        M: Message,
        H: MessageHandler<M> + 'static,
    {
        self.subscribe_handler(M::TOPIC, TypedHandler::<M, H>::new(handler))
    }

    /// Topics that must have a handler when `build` runs.
    pub fn expect_topics(mut self, topics: &[&str]) -> Self {
        self.expected_topics
            .extend(topics.iter().map(|topic| topic.to_string()));
        self
    }

    pub fn build(self) -> Result<MessageQueue, BuildError> {
        if let Some(err) = self.options_error {
            return Err(err.into());
        }

        let missing: Vec<String> = self
            .expected_topics
            .into_iter()
            .filter(|topic| !self.registry.contains(topic))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingTopics(missing));
        }

        Ok(MessageQueue::with_parts(
            self.options,
            self.registry,
            self.sink,
        ))
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
