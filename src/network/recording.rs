//! In-memory transport recording every outbound item.

use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use lexparty_proto::{ChatId, MessageId, Sendable};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// One recorded send.
#[derive(Debug, Clone)]
pub struct Sent {
    /// Message id assigned to sends that create a message.
    pub id: Option<MessageId>,
    pub msg: Sendable,
}

/// Transport that assigns message ids, records every item and can be told
/// to reject a chat.
#[derive(Debug)]
pub struct RecordingTransport {
    next_id: AtomicI64,
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Reject every later send to `chat` with `Forbidden`.
    pub fn fail_chat(&self, chat: ChatId) {
        self.failing.lock().insert(chat);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, chat: ChatId) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.msg.chat_id() == Some(chat))
            .cloned()
            .collect()
    }

    /// Texts of messages and edits sent to `chat`.
    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent_to(chat)
            .into_iter()
            .filter_map(|s| s.msg.body().map(str::to_string))
            .collect()
    }

    /// Whether any text sent to `chat` contains `needle`.
    pub fn saw(&self, chat: ChatId, needle: &str) -> bool {
        self.texts_to(chat).iter().any(|t| t.contains(needle))
    }

    pub fn find(&self, pred: impl Fn(&Sent) -> bool) -> Option<Sent> {
        self.sent.lock().iter().find(|s| pred(s)).cloned()
    }

    /// Newest new message to `chat` carrying a button with `data`.
    pub fn message_with_button(&self, chat: ChatId, data: &str) -> Option<MessageId> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|s| {
                s.id.is_some()
                    && s.msg.chat_id() == Some(chat)
                    && s.msg.inline_keyboard().is_some_and(|kb| kb.find(data).is_some())
            })
            .and_then(|s| s.id)
    }

    /// Poll (in virtual time under a paused clock) until `check` yields.
    pub async fn wait_for<T>(&self, limit: Duration, check: impl Fn(&Self) -> Option<T>) -> Option<T> {
        let step = Duration::from_millis(50);
        let mut waited = Duration::ZERO;
        loop {
            if let Some(found) = check(self) {
                return Some(found);
            }
            if waited >= limit {
                return None;
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, msg: Sendable) -> Result<Option<MessageId>, TransportError> {
        if let Some(chat) = msg.chat_id()
            && self.failing.lock().contains(&chat)
        {
            return Err(TransportError::Forbidden(format!("chat {chat} blocked the bot")));
        }
        let id = match msg {
            Sendable::Text { .. } | Sendable::Sticker { .. } => {
                Some(self.next_id.fetch_add(1, Ordering::Relaxed))
            }
            _ => None,
        };
        self.sent.lock().push(Sent { id, msg });
        Ok(id)
    }
}
