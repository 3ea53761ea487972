//! Typed - Handler と Registry
//!
//! topic 名の typo を型で排除し、payload 型と Handler の対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Message` trait, `MessageHandler<M>` trait - 型安全
//! - **内部（Untyped）**: `Handler` trait - object-safe、JSON payload をそのまま受け取る
//!
//! `FnHandler` は async closure を、`TypedHandler` は `MessageHandler<M>` を
//! `Handler` に変換します。

pub mod handler;
pub mod message;
pub mod registry;

pub use self::handler::{FnHandler, Handler, MessageHandler, TypedHandler};
pub use self::message::Message;
pub use self::registry::HandlerRegistry;
