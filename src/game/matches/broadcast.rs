//! Outbound delivery for a match.
//!
//! Two modes:
//! - synchronous: [`MatchSession::send_now`] / [`MatchSession::broadcast_now`]
//!   await each send, preserving the caller's ordering; a `Forbidden` reply
//!   flags the recipient offline;
//! - asynchronous: [`MatchSession::broadcast_later`] queues onto the
//!   [`Outbox`], drained by a small worker pool.

use super::MatchSession;
use crate::metrics;
use crate::network::SharedTransport;
use lexparty_proto::{ChatId, MessageId, Sendable, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Capacity of a match's send queue.
pub const SEND_QUEUE: usize = 10;

/// Send workers per match: half the CPUs, at least one.
pub fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// Queue of asynchronous sends shared by the worker pool.
pub struct Outbox {
    tx: Mutex<Option<mpsc::Sender<Sendable>>>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Sendable>>>,
}

impl Outbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(SEND_QUEUE);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }

    /// Spawn the drain workers. They exit once the outbox is closed and
    /// empty.
    pub fn spawn_workers(&self, transport: SharedTransport, code: u32) -> Vec<JoinHandle<()>> {
        (0..worker_count())
            .map(|worker| {
                let rx = Arc::clone(&self.rx);
                let transport = Arc::clone(&transport);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(msg) = next else { break };
                        let chat_id = msg.chat_id();
                        if let Err(e) = transport.send(msg).await {
                            metrics::record_send_failure();
                            warn!(code, worker, chat_id, error = %e, "Queued send failed");
                        }
                    }
                    debug!(code, worker, "Send worker stopped");
                })
            })
            .collect()
    }

    /// Queue a send. Returns false once the outbox is closed.
    pub async fn enqueue(&self, msg: Sendable) -> bool {
        let Some(tx) = self.tx.lock().clone() else {
            return false;
        };
        tx.send(msg).await.is_ok()
    }

    /// Stop accepting sends; workers finish what is queued.
    pub fn close(&self) {
        self.tx.lock().take();
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchSession {
    /// Send one item and wait for the result. Failures are logged; a chat
    /// that refuses delivery marks its player offline.
    pub(super) async fn send_now(&self, msg: Sendable) -> Option<MessageId> {
        let chat_id = msg.chat_id();
        match self.deps.transport.send(msg).await {
            Ok(id) => id,
            Err(e) => {
                metrics::record_send_failure();
                warn!(code = self.code(), chat_id, error = %e, "Send failed");
                if e.is_forbidden()
                    && let Some(chat_id) = chat_id
                {
                    self.mark_offline(chat_id);
                }
                None
            }
        }
    }

    fn mark_offline(&self, chat_id: ChatId) {
        let mut inner = self.inner.write();
        for player in inner.players.iter_mut().filter(|p| p.chat_id == chat_id) {
            player.offline = true;
        }
    }

    /// Chats of playing, reachable players except `except`.
    pub(super) fn audience(&self, except: Option<UserId>) -> Vec<ChatId> {
        self.inner
            .read()
            .players
            .iter()
            .filter(|p| p.is_alive() && Some(p.user_id) != except)
            .map(|p| p.chat_id)
            .collect()
    }

    /// Send `text` to every alive player in order.
    pub(super) async fn broadcast_now(&self, text: &str, except: Option<UserId>) {
        for chat_id in self.audience(except) {
            self.send_now(Sendable::text(chat_id, text)).await;
        }
    }

    /// Queue `text` for every alive player.
    pub(super) async fn broadcast_later(&self, text: &str, except: Option<UserId>) {
        for chat_id in self.audience(except) {
            if !self.outbox.enqueue(Sendable::text(chat_id, text)).await {
                debug!(code = self.code(), "Outbox closed, dropping broadcast");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::recording::RecordingTransport;
    use std::time::Duration;

    #[tokio::test]
    async fn workers_drain_then_stop_on_close() {
        let transport = Arc::new(RecordingTransport::new());
        let outbox = Outbox::new();
        let workers = outbox.spawn_workers(transport.clone(), 1);
        for i in 0..25 {
            assert!(outbox.enqueue(Sendable::text(7, format!("n{i}"))).await);
        }
        outbox.close();
        assert!(!outbox.enqueue(Sendable::text(7, "late")).await);
        for w in workers {
            tokio::time::timeout(Duration::from_secs(5), w).await.unwrap().unwrap();
        }
        assert_eq!(transport.texts_to(7).len(), 25);
    }

    #[test]
    fn at_least_one_worker() {
        assert!(worker_count() >= 1);
    }
}
