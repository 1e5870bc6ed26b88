//! Chat transport adapters.
//!
//! - [`Transport`]: the outbound seam used by sessions and handlers
//! - [`telegram`]: Bot API client (long polling, webhook registration,
//!   throttled sends)
//! - `recording`: in-memory transport for tests

#[cfg(test)]
pub mod recording;
pub mod telegram;

pub use telegram::TelegramTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use lexparty_proto::{MessageId, Sendable};
use std::sync::Arc;

/// Delivers outbound items to the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one item. Returns the id of the created message for sends that
    /// create one (text messages and stickers).
    async fn send(&self, msg: Sendable) -> Result<Option<MessageId>, TransportError>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn Transport>;
