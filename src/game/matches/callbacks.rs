//! Per-message callback table.
//!
//! Every inline keyboard the engine sends is registered under the id of the
//! message carrying it. A click is honoured only when its message id is in
//! the table, its data fits the entry kind and, for personal buttons, the
//! clicker is the user the entry was created for.

use crate::ui::data;
use lexparty_proto::{MessageId, UserId};
use std::collections::HashMap;

/// What a registered keyboard does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// Active player is ready to receive a letter.
    Ready,
    /// Active player stops the timer.
    Stop,
    /// Thumbs up/down on the current answer. Lives until the vote closes.
    Vote,
    /// Active player acknowledged the drawn bonus.
    BonusAck,
}

impl CallbackKind {
    /// Whether `payload` is one of this kind's buttons.
    pub fn accepts(self, payload: &str) -> bool {
        match self {
            Self::Ready => payload == data::READY,
            Self::Stop => payload == data::STOP,
            Self::Vote => payload == data::VOTE_UP || payload == data::VOTE_DOWN,
            Self::BonusAck => payload == data::BONUS_ACK,
        }
    }

    /// One-shot entries are removed on their first accepted click.
    pub fn is_one_shot(self) -> bool {
        !matches!(self, Self::Vote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackEntry {
    pub kind: CallbackKind,
    /// Owner of the keyboard: the active player, or the voter.
    pub user: UserId,
}

/// Callback entries keyed by outbound message id.
#[derive(Debug, Default)]
pub struct CallbackTable {
    entries: HashMap<MessageId, CallbackEntry>,
}

impl CallbackTable {
    pub fn register(&mut self, message_id: MessageId, kind: CallbackKind, user: UserId) {
        self.entries.insert(message_id, CallbackEntry { kind, user });
    }

    /// Check a click. Returns the entry when it is honoured, removing
    /// one-shot entries.
    pub fn accept(&mut self, message_id: MessageId, user: UserId, payload: &str) -> Option<CallbackEntry> {
        let entry = *self.entries.get(&message_id)?;
        if entry.user != user || !entry.kind.accepts(payload) {
            return None;
        }
        if entry.kind.is_one_shot() {
            self.entries.remove(&message_id);
        }
        Some(entry)
    }

    pub fn remove(&mut self, message_id: MessageId) -> Option<CallbackEntry> {
        self.entries.remove(&message_id)
    }

    /// Drop every entry of `kind`, returning their message ids.
    pub fn remove_kind(&mut self, kind: CallbackKind) -> Vec<MessageId> {
        let ids: Vec<MessageId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.entries.remove(id);
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_entries_fire_once() {
        let mut table = CallbackTable::default();
        table.register(10, CallbackKind::Ready, 1);
        assert!(table.accept(10, 1, data::READY).is_some());
        assert!(table.accept(10, 1, data::READY).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn foreign_or_mismatched_clicks_are_ignored() {
        let mut table = CallbackTable::default();
        table.register(10, CallbackKind::Stop, 1);
        assert!(table.accept(10, 2, data::STOP).is_none());
        assert!(table.accept(10, 1, data::READY).is_none());
        assert!(table.accept(11, 1, data::STOP).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn vote_entries_persist_until_removed() {
        let mut table = CallbackTable::default();
        table.register(20, CallbackKind::Vote, 1);
        table.register(21, CallbackKind::Vote, 2);
        table.register(22, CallbackKind::Stop, 1);
        assert!(table.accept(20, 1, data::VOTE_UP).is_some());
        assert!(table.accept(20, 1, data::VOTE_DOWN).is_some());
        let mut removed = table.remove_kind(CallbackKind::Vote);
        removed.sort_unstable();
        assert_eq!(removed, vec![20, 21]);
        assert_eq!(table.len(), 1);
    }
}
