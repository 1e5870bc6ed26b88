//! Vote on the active player's answer.

use lexparty_proto::{ChatId, MessageId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// Running ballot. Voters are fixed when the vote opens; a voter who leaves
/// is withdrawn together with their ballot.
#[derive(Debug, Default)]
pub struct Vote {
    ballots: HashMap<UserId, Option<bool>>,
    messages: Vec<(ChatId, MessageId)>,
    closed: Arc<Notify>,
}

impl Vote {
    pub fn new(voters: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ballots: voters.into_iter().map(|u| (u, None)).collect(),
            messages: Vec::new(),
            closed: Arc::new(Notify::new()),
        }
    }

    /// Notified once every remaining voter has cast a ballot.
    pub fn closed(&self) -> Arc<Notify> {
        Arc::clone(&self.closed)
    }

    /// Wake the waiting round if the ballot is complete.
    pub fn notify_if_complete(&self) {
        if self.is_complete() {
            self.closed.notify_one();
        }
    }

    /// Remember a vote message so counts can be refreshed on every ballot.
    pub fn track(&mut self, chat_id: ChatId, message_id: MessageId) {
        self.messages.push((chat_id, message_id));
    }

    pub fn messages(&self) -> &[(ChatId, MessageId)] {
        &self.messages
    }

    /// Record a ballot. Returns false for non-voters and repeated ballots.
    pub fn cast(&mut self, user: UserId, up: bool) -> bool {
        match self.ballots.get_mut(&user) {
            Some(slot @ None) => {
                *slot = Some(up);
                true
            }
            _ => false,
        }
    }

    /// Remove a voter and their ballot.
    pub fn withdraw(&mut self, user: UserId) -> bool {
        self.ballots.remove(&user).is_some()
    }

    pub fn up(&self) -> usize {
        self.ballots.values().filter(|b| **b == Some(true)).count()
    }

    pub fn down(&self) -> usize {
        self.ballots.values().filter(|b| **b == Some(false)).count()
    }

    pub fn voters(&self) -> usize {
        self.ballots.len()
    }

    /// Every remaining voter has cast a ballot.
    pub fn is_complete(&self) -> bool {
        self.ballots.values().all(Option::is_some)
    }

    /// The answer stands unless thumbs down outnumber thumbs up.
    pub fn accepted(&self) -> bool {
        self.up() >= self.down()
    }
}
