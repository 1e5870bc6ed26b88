//! Players and their per-round rates.

use lexparty_proto::{ChatId, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one player's turn in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Time between the timer start and its stop.
    pub duration: Duration,
    pub points: i64,
    /// Whether the player stopped the timer before it ran out (and the vote,
    /// if any, kept the answer).
    pub completed: bool,
    /// Name of the bonus task played during the turn.
    #[serde(default)]
    pub bonus: Option<String>,
}

impl Rate {
    /// Placeholder for a round the player missed.
    pub fn missed() -> Self {
        Self::default()
    }
}

/// Membership state of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    Leaving,
}

/// A participant of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub name: String,
    pub rates: Vec<Rate>,
    pub state: PlayerState,
    /// Set when the chat refused delivery.
    #[serde(default)]
    pub offline: bool,
}

impl Player {
    pub fn new(user_id: UserId, chat_id: ChatId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            name: name.into(),
            rates: Vec::new(),
            state: PlayerState::Playing,
            offline: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// Playing and reachable.
    pub fn is_alive(&self) -> bool {
        self.is_playing() && !self.offline
    }

    /// Whether the player still has a turn in round `round`.
    pub fn is_eligible(&self, round: usize) -> bool {
        self.is_playing() && self.rates.len() <= round
    }

    pub fn total_points(&self) -> i64 {
        self.rates.iter().map(|r| r.points).sum()
    }

    /// Fill missed rounds before `round` with zero-point rates.
    pub fn pad_rates(&mut self, round: usize) {
        while self.rates.len() < round {
            self.rates.push(Rate::missed());
        }
    }
}

/// Players tied for the highest total among those who played at least one
/// round.
pub fn favorites(players: &[Player]) -> Vec<UserId> {
    let Some(best) = players
        .iter()
        .filter(|p| !p.rates.is_empty())
        .map(Player::total_points)
        .max()
    else {
        return Vec::new();
    };
    players
        .iter()
        .filter(|p| !p.rates.is_empty() && p.total_points() == best)
        .map(|p| p.user_id)
        .collect()
}
