//! Delivery channels: the rate-limited primary (chat-bot HTTP) and the
//! email fallback, behind a shared capability interface so the worker pool
//! (`gateway-worker`) never depends on either concretely.

mod email;
mod error;
mod telegram;

use async_trait::async_trait;
use gateway_types::Message;

pub use email::{EmailConfig, EmailDispatcher, EmailMetrics};
pub use error::DispatchError;
pub use telegram::{TelegramConfig, TelegramDispatcher, TelegramMetrics};

/// A delivery channel: attempt to deliver `message`, returning whether it
/// succeeded. Implementations never propagate errors out of `send`. Every
/// failure mode (timeout, rate limit, unconfigured channel, transport
/// error) resolves to `false` and is recorded internally as a metric.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, message: &Message) -> bool;
}
