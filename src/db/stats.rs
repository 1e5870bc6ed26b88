//! Per-user match statistics.
//!
//! # Schema
//!
//! ```text
//! stat<user_id>: record uuid -> StatRecord (serde_json)
//! ```
//!
//! One record is appended per (user, finished match). Aggregates are
//! computed on read and cached per user until the next append.

use super::DbError;
use super::cache::LruCache;
use crate::game::{MatchConfig, Rate};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lexparty_proto::UserId;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

fn table_name(user_id: UserId) -> String {
    format!("stat{user_id}")
}

/// How a player finished a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Favorite,
    Participant,
}

/// Points per round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsSummary {
    pub best: i64,
    pub worst: i64,
    pub avg: f64,
}

impl PointsSummary {
    fn of(points: &[i64]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        Self {
            best: points.iter().copied().max().unwrap_or_default(),
            worst: points.iter().copied().min().unwrap_or_default(),
            avg: points.iter().sum::<i64>() as f64 / points.len() as f64,
        }
    }
}

/// Answer times of completed rounds, in milliseconds. Best is fastest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub best_ms: u64,
    pub worst_ms: u64,
    pub avg_ms: f64,
}

impl TimeSummary {
    fn of(millis: &[u64]) -> Self {
        if millis.is_empty() {
            return Self::default();
        }
        Self {
            best_ms: millis.iter().copied().min().unwrap_or_default(),
            worst_ms: millis.iter().copied().max().unwrap_or_default(),
            avg_ms: millis.iter().sum::<u64>() as f64 / millis.len() as f64,
        }
    }
}

/// Statistics of one user in one finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub uuid: Uuid,
    pub user_id: UserId,
    pub points: PointsSummary,
    pub duration: TimeSummary,
    /// Whether `duration` has any completed round behind it.
    #[serde(default)]
    pub timed: bool,
    pub rounds_num: u32,
    pub outcome: Outcome,
    pub categories: Vec<String>,
    pub bonus_names: Vec<String>,
    pub players_num: usize,
    pub vote_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl StatRecord {
    /// Summarise a player's rates.
    pub fn from_rates(
        user_id: UserId,
        rates: &[Rate],
        outcome: Outcome,
        config: &MatchConfig,
        players_num: usize,
    ) -> Self {
        let points: Vec<i64> = rates.iter().map(|r| r.points).collect();
        let millis: Vec<u64> = rates
            .iter()
            .filter(|r| r.completed)
            .map(|r| r.duration.as_millis() as u64)
            .collect();
        let bonus_names = rates.iter().filter_map(|r| r.bonus.clone()).collect();
        Self {
            uuid: Uuid::new_v4(),
            user_id,
            points: PointsSummary::of(&points),
            duration: TimeSummary::of(&millis),
            timed: !millis.is_empty(),
            rounds_num: config.rounds,
            outcome,
            categories: config.categories.clone(),
            bonus_names,
            players_num,
            vote_enabled: config.vote,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate over every record of a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatAggregate {
    pub games: u64,
    pub wins: u64,
    pub points: PointsSummary,
    pub duration: TimeSummary,
    /// Distinct bonus names seen.
    pub bonus_names: BTreeSet<String>,
}

impl StatAggregate {
    pub fn from_records(records: &[StatRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let games = records.len() as u64;
        let wins = records
            .iter()
            .filter(|r| r.outcome == Outcome::Favorite)
            .count() as u64;

        let points = PointsSummary {
            best: records.iter().map(|r| r.points.best).max().unwrap_or_default(),
            worst: records.iter().map(|r| r.points.worst).min().unwrap_or_default(),
            avg: records.iter().map(|r| r.points.avg).sum::<f64>() / records.len() as f64,
        };

        let timed: Vec<&StatRecord> = records.iter().filter(|r| r.timed).collect();
        let duration = if timed.is_empty() {
            TimeSummary::default()
        } else {
            TimeSummary {
                best_ms: timed.iter().map(|r| r.duration.best_ms).min().unwrap_or_default(),
                worst_ms: timed.iter().map(|r| r.duration.worst_ms).max().unwrap_or_default(),
                avg_ms: timed.iter().map(|r| r.duration.avg_ms).sum::<f64>() / timed.len() as f64,
            }
        };

        let bonus_names = records
            .iter()
            .flat_map(|r| r.bonus_names.iter().cloned())
            .collect();

        Self {
            games,
            wins,
            points,
            duration,
            bonus_names,
        }
    }
}

/// Append-only statistics store.
pub struct StatRepository {
    db: Arc<Database>,
    cache: LruCache<UserId, StatAggregate>,
    /// Bumped on every append; an aggregate computed under an older
    /// generation is never cached.
    generations: DashMap<UserId, u64>,
}

impl StatRepository {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        Self {
            db,
            cache: LruCache::new(cache_size),
            generations: DashMap::new(),
        }
    }

    /// Append a record and invalidate the user's cached aggregate.
    pub fn append(&self, record: &StatRecord) -> Result<(), DbError> {
        let name = table_name(record.user_id);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);
        let key = record.uuid.to_string();
        let value = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(def)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        {
            let mut generation = self.generations.entry(record.user_id).or_insert(0);
            *generation += 1;
            self.cache.remove(&record.user_id);
        }
        debug!(user_id = record.user_id, uuid = %record.uuid, "Appended stat record");
        Ok(())
    }

    /// Every record of a user, in key order.
    pub fn records(&self, user_id: UserId) -> Result<Vec<StatRecord>, DbError> {
        let name = table_name(user_id);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);

        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for item in table.iter()? {
            let (_key, value) = item?;
            match serde_json::from_slice::<StatRecord>(value.value()) {
                Ok(record) => records.push(record),
                Err(e) => warn!(user_id, error = %e, "Failed to deserialize stat record, skipping"),
            }
        }
        Ok(records)
    }

    /// Aggregate of every record of a user.
    pub fn aggregate(&self, user_id: UserId) -> Result<StatAggregate, DbError> {
        if let Some(cached) = self.cache.get(&user_id) {
            return Ok(cached);
        }
        let generation = self.generation(user_id);
        let aggregate = StatAggregate::from_records(&self.records(user_id)?);
        self.cache_aggregate(user_id, generation, &aggregate);
        Ok(aggregate)
    }

    fn generation(&self, user_id: UserId) -> u64 {
        self.generations.get(&user_id).map_or(0, |g| *g)
    }

    /// Cache `aggregate` unless a record was appended since `generation`
    /// was read.
    fn cache_aggregate(&self, user_id: UserId, generation: u64, aggregate: &StatAggregate) {
        let current = self.generations.entry(user_id).or_insert(0);
        if *current == generation {
            self.cache.insert(user_id, aggregate.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::game::BonusPolicy;
    use std::time::Duration;

    fn config() -> MatchConfig {
        MatchConfig {
            author_id: 1,
            author_name: "Anna".into(),
            rounds: 2,
            round_secs: 30,
            letters: vec!['А'],
            categories: vec!["Город".into(), "Имя".into(), "Бренд".into()],
            vote: false,
            bonus_enabled: true,
            bonus: Vec::new(),
            bonus_policy: BonusPolicy::Uniform,
            code: 77,
        }
    }

    fn rate(points: i64, secs: u64, bonus: Option<&str>) -> Rate {
        Rate {
            duration: Duration::from_secs(secs),
            points,
            completed: points > 0,
            bonus: bonus.map(String::from),
        }
    }

    #[test]
    fn test_record_summarises_rates() {
        let rates = [rate(20, 10, Some("Шёпот")), rate(0, 30, None)];
        let record = StatRecord::from_rates(2, &rates, Outcome::Favorite, &config(), 3);
        assert_eq!(record.points.best, 20);
        assert_eq!(record.points.worst, 0);
        assert_eq!(record.points.avg, 10.0);
        // Only the completed round is timed.
        assert_eq!(record.duration.best_ms, 10_000);
        assert_eq!(record.duration.worst_ms, 10_000);
        assert_eq!(record.bonus_names, vec!["Шёпот".to_string()]);
        assert_eq!(record.players_num, 3);
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let (db, _dir) = test_database();
        assert!(db.stats().records(404).unwrap().is_empty());
        assert_eq!(db.stats().aggregate(404).unwrap(), StatAggregate::default());
    }

    #[test]
    fn test_append_invalidates_aggregate() {
        let (db, _dir) = test_database();
        let stats = db.stats();

        let first = StatRecord::from_rates(
            5,
            &[rate(25, 5, Some("a"))],
            Outcome::Favorite,
            &config(),
            2,
        );
        stats.append(&first).unwrap();
        let agg = stats.aggregate(5).unwrap();
        assert_eq!(agg.games, 1);
        assert_eq!(agg.wins, 1);

        let second = StatRecord::from_rates(
            5,
            &[rate(10, 20, Some("b")), rate(0, 30, Some("a"))],
            Outcome::Participant,
            &config(),
            2,
        );
        stats.append(&second).unwrap();
        let agg = stats.aggregate(5).unwrap();
        assert_eq!(agg.games, 2);
        assert_eq!(agg.wins, 1);
        assert_eq!(agg.points.best, 25);
        assert_eq!(agg.points.worst, 0);
        assert_eq!(agg.duration.best_ms, 5_000);
        assert_eq!(agg.duration.worst_ms, 20_000);
        assert_eq!(agg.bonus_names.len(), 2);
    }

    #[test]
    fn test_aggregate_read_before_append_is_not_cached() {
        let (db, _dir) = test_database();
        let stats = db.stats();
        let record = |points| StatRecord::from_rates(6, &[rate(points, 5, None)], Outcome::Favorite, &config(), 1);
        stats.append(&record(10)).unwrap();

        // A reader computes its aggregate, then an append commits before
        // the reader gets to cache it.
        let generation = stats.generation(6);
        let stale = StatAggregate::from_records(&stats.records(6).unwrap());
        stats.append(&record(20)).unwrap();
        stats.cache_aggregate(6, generation, &stale);

        let agg = stats.aggregate(6).unwrap();
        assert_eq!(agg.games, 2);
        assert_eq!(agg.points.best, 20);
    }

    #[test]
    fn test_users_have_separate_tables() {
        let (db, _dir) = test_database();
        let record = StatRecord::from_rates(1, &[rate(3, 1, None)], Outcome::Favorite, &config(), 1);
        db.stats().append(&record).unwrap();
        assert_eq!(db.stats().records(1).unwrap().len(), 1);
        assert!(db.stats().records(2).unwrap().is_empty());
    }
}
