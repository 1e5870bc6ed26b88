//! Match snapshot repository.
//!
//! Stores in-flight matches at shutdown so they survive a restart.
//!
//! # Schema
//!
//! ```text
//! states: match code (decimal) -> MatchSnapshot (serde_json)
//! ```
//!
//! The whole table is dropped once the snapshots are restored.

use super::DbError;
use crate::game::MatchSnapshot;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use std::sync::Arc;
use tracing::{debug, info, warn};

const STATES: TableDefinition<&str, &[u8]> = TableDefinition::new("states");

/// Redb-backed match snapshot persistence.
pub struct SnapshotRepository {
    db: Arc<Database>,
}

impl SnapshotRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Save (or replace) the snapshot of a match.
    pub fn save(&self, snapshot: &MatchSnapshot) -> Result<(), DbError> {
        let key = snapshot.code.to_string();
        let value = serde_json::to_vec(snapshot)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STATES)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        debug!(code = snapshot.code, "Saved match snapshot");
        Ok(())
    }

    /// Load every stored snapshot. Undecodable entries are skipped.
    pub fn load_all(&self) -> Result<Vec<MatchSnapshot>, DbError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(STATES) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            match serde_json::from_slice::<MatchSnapshot>(value.value()) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(code = %key.value(), error = %e, "Failed to deserialize match snapshot, skipping");
                }
            }
        }

        info!(count = snapshots.len(), "Loaded match snapshots");
        Ok(snapshots)
    }

    /// Drop the snapshot table. Returns whether it existed.
    pub fn drop_all(&self) -> Result<bool, DbError> {
        let write_txn = self.db.begin_write()?;
        let existed = write_txn.delete_table(STATES)?;
        write_txn.commit()?;
        Ok(existed)
    }
}
