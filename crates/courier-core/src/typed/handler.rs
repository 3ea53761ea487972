//! Handler traits - payload を処理する Handler の定義
//!
//! # 学習ポイント
//! - Object-safe trait (`Handler`) - registry が保持する形
//! - ジェネリック trait (`MessageHandler<M>`) - デコード済みの `Message` を受け取る
//! - Type erasure パターン (`TypedHandler<M, H>` → `Handler`)
//! - Closure adapter (`FnHandler`)

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::message::Message;
use crate::domain::HandlerError;

/// Consumes the payload of one job.
///
/// Returning `Err` counts as a failed attempt and drives the retry policy.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, payload: serde_json::Value) -> Result<(), HandlerError>;
}

/// Adapts an async closure into a `Handler`.
///
/// Synchronous work fits too: return `std::future::ready(result)`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), HandlerError>> + Send,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, payload: serde_json::Value) -> Result<(), HandlerError> {
        (self.f)(payload).await
    }
}

/// Consumes a decoded message.
///
/// ```ignore
/// struct SaveUserHandler;
///
/// #[async_trait]
/// impl MessageHandler<SaveUser> for SaveUserHandler {
///     async fn handle(&self, message: SaveUser) -> Result<(), HandlerError> {
///         db.save(&message.name).await.map_err(HandlerError::from_error)
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler<M: Message>: Send + Sync {
    async fn handle(&self, message: M) -> Result<(), HandlerError>;
}

/// Decodes the payload into `M` before handing it to `H`.
///
/// A payload that does not decode fails the attempt with
/// `HandlerError::Decode`, which is retried like any other failure.
pub struct TypedHandler<M: Message, H: MessageHandler<M>> {
    handler: H,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message, H: MessageHandler<M>> TypedHandler<M, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    pub fn topic(&self) -> &'static str {
        M::TOPIC
    }
}

#[async_trait]
impl<M: Message, H: MessageHandler<M>> Handler for TypedHandler<M, H> {
    async fn handle(&self, payload: serde_json::Value) -> Result<(), HandlerError> {
        let message: M = serde_json::from_value(payload)?;
        self.handler.handle(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::message::fixtures::Ping;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct SumPings {
        total: Arc<AtomicI32>,
    }

    #[async_trait]
    impl MessageHandler<Ping> for SumPings {
        async fn handle(&self, message: Ping) -> Result<(), HandlerError> {
            self.total.fetch_add(message.value, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_payload() {
        let total = Arc::new(AtomicI32::new(0));
        let handler = TypedHandler::new(SumPings {
            total: total.clone(),
        });

        handler.handle(json!({ "value": 100 })).await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 100);
        assert_eq!(handler.topic(), "test.ping");
    }

    #[tokio::test]
    async fn typed_handler_reports_decode_failure() {
        let handler = TypedHandler::new(SumPings {
            total: Arc::new(AtomicI32::new(0)),
        });

        let err = handler.handle(json!({ "value": "nope" })).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn fn_handler_runs_closure() {
        let handler = FnHandler::new(|payload: serde_json::Value| async move {
            if payload["ok"] == true {
                Ok(())
            } else {
                Err(HandlerError::failed("not ok"))
            }
        });

        assert!(handler.handle(json!({ "ok": true })).await.is_ok());
        assert_eq!(
            handler.handle(json!({ "ok": false })).await,
            Err(HandlerError::failed("not ok"))
        );
    }

    #[tokio::test]
    async fn fn_handler_accepts_sync_work() {
        let handler = FnHandler::new(|_payload| std::future::ready(Ok(())));
        assert!(handler.handle(json!(null)).await.is_ok());
    }
}
