//! Database module for persistent storage.
//!
//! Provides redb-backed persistence for:
//! - User records (`users` table, big-endian user id keys)
//! - Per-user match statistics (one `stat<user_id>` table per user)
//! - Match snapshots written at shutdown (`states` table)
//!
//! All three repositories share one database file. Values are `serde_json`
//! blobs.

mod cache;
mod snapshots;
mod stats;
mod users;

pub use cache::LruCache;
pub use snapshots::SnapshotRepository;
pub use stats::{Outcome, PointsSummary, StatAggregate, StatRecord, StatRepository, TimeSummary};
pub use users::UserRepository;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Database handle owning the repositories.
pub struct Database {
    users: UserRepository,
    stats: StatRepository,
    snapshots: SnapshotRepository,
}

impl Database {
    /// Open (or create) the database file and make sure the shared tables
    /// exist.
    pub fn open(path: impl AsRef<Path>, cache_size: usize) -> Result<Self, DbError> {
        let path = path.as_ref();
        let db = Arc::new(redb::Database::create(path)?);
        info!(path = %path.display(), "Database opened");
        Self::with_handle(db, cache_size)
    }

    fn with_handle(db: Arc<redb::Database>, cache_size: usize) -> Result<Self, DbError> {
        Ok(Self {
            users: UserRepository::new(Arc::clone(&db), cache_size)?,
            stats: StatRepository::new(Arc::clone(&db), cache_size),
            snapshots: SnapshotRepository::new(db),
        })
    }

    /// Get user repository.
    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Get statistics repository.
    pub fn stats(&self) -> &StatRepository {
        &self.stats
    }

    /// Get match snapshot repository.
    pub fn snapshots(&self) -> &SnapshotRepository {
        &self.snapshots
    }
}

#[cfg(test)]
pub(crate) fn test_database() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.redb"), 16).unwrap();
    (db, dir)
}
