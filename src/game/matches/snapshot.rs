//! Serialized form of an in-flight match.

use super::{MatchSession, MatchState};
use crate::game::{Bonus, MatchConfig, Player};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything needed to resume a match after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub code: u32,
    /// Configured match lifetime.
    pub timeout_secs: u64,
    pub config: MatchConfig,
    pub state: MatchState,
    pub round: u32,
    pub players: Vec<Player>,
    /// Bonus catalog still available to draw from.
    #[serde(default)]
    pub bonus_left: Vec<Bonus>,
    pub created_at: DateTime<Utc>,
}

impl MatchSnapshot {
    /// Lifetime left at `now`, measured from the match creation time.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.created_at).to_std().unwrap_or_default();
        Duration::from_secs(self.timeout_secs).saturating_sub(elapsed)
    }
}

impl MatchSession {
    pub fn snapshot(&self) -> MatchSnapshot {
        let inner = self.inner.read();
        MatchSnapshot {
            code: self.config.code,
            timeout_secs: self.deps.timing.lifetime.as_secs(),
            config: self.config.clone(),
            state: inner.state,
            round: inner.round,
            players: inner.players.clone(),
            bonus_left: inner.bonus_left.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
pub fn sample_snapshot(code: u32) -> MatchSnapshot {
    use crate::game::{BonusPolicy, Rate};

    let rate = |points: i64| Rate {
        duration: Duration::from_secs(10),
        points,
        completed: points > 0,
        bonus: None,
    };
    let players = (1..=3)
        .map(|id| {
            let mut p = Player::new(100 + id, 100 + id, format!("player{id}"));
            p.rates = vec![rate(id * 5), rate(0)];
            p
        })
        .collect();
    MatchSnapshot {
        code,
        timeout_secs: 86_400,
        config: MatchConfig {
            author_id: 1,
            author_name: "host".into(),
            rounds: 3,
            round_secs: 30,
            letters: vec!['А', 'Б', 'В'],
            categories: vec!["Город".into(), "Имя".into(), "Бренд".into()],
            vote: false,
            bonus_enabled: false,
            bonus: Vec::new(),
            bonus_policy: BonusPolicy::Uniform,
            code,
        },
        state: MatchState::Processing,
        round: 1,
        players,
        bonus_left: Vec::new(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_down_from_creation() {
        let mut snap = sample_snapshot(1);
        snap.timeout_secs = 100;
        let now = snap.created_at + chrono::Duration::seconds(40);
        assert_eq!(snap.remaining(now), Duration::from_secs(60));
        let later = snap.created_at + chrono::Duration::seconds(400);
        assert_eq!(snap.remaining(later), Duration::ZERO);
    }

    #[test]
    fn snapshot_survives_json() {
        let snap = sample_snapshot(9);
        let bytes = serde_json::to_vec(&snap).unwrap();
        let back: MatchSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, snap);
    }
}
