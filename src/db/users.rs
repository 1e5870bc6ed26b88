//! User repository.
//!
//! # Schema
//!
//! ```text
//! users: user_id (8 bytes, big-endian) -> User (serde_json)
//! ```
//!
//! Reads go through an LRU cache; writes go to the table first and then
//! replace the cached copy.

use super::DbError;
use super::cache::LruCache;
use crate::state::{User, UserStatus, same_username};
use lexparty_proto::{UserId, UserProfile};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;
use tracing::{debug, info, warn};

const USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");

fn user_key(id: UserId) -> [u8; 8] {
    id.to_be_bytes()
}

/// Store-through-cache access to user records.
pub struct UserRepository {
    db: Arc<Database>,
    cache: LruCache<UserId, User>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Result<Self, DbError> {
        // Ensure table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        info!(cache_size, "User store initialized");
        Ok(Self {
            db,
            cache: LruCache::new(cache_size),
        })
    }

    /// Persist a user and refresh its cached copy.
    pub fn store(&self, user: &User) -> Result<(), DbError> {
        let value = serde_json::to_vec(user)?;
        let key = user_key(user.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            table.insert(key.as_slice(), value.as_slice())?;
        }
        write_txn.commit()?;

        self.cache.insert(user.id, user.clone());
        debug!(user_id = user.id, "Stored user");
        Ok(())
    }

    /// Fetch a user by id, consulting the cache first.
    pub fn fetch(&self, id: UserId) -> Result<Option<User>, DbError> {
        if let Some(user) = self.cache.get(&id) {
            return Ok(Some(user));
        }

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let key = user_key(id);
        let Some(raw) = table.get(key.as_slice())? else {
            return Ok(None);
        };
        let user: User = serde_json::from_slice(raw.value())?;
        self.cache.insert(id, user.clone());
        Ok(Some(user))
    }

    /// Find a user by username with a full scan (case-insensitive, `@`
    /// optional).
    pub fn fetch_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        for item in table.iter()? {
            let (_key, value) = item?;
            match serde_json::from_slice::<User>(value.value()) {
                Ok(user) => {
                    if user
                        .username
                        .as_deref()
                        .is_some_and(|u| same_username(u, username))
                    {
                        self.cache.insert(user.id, user.clone());
                        return Ok(Some(user));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize stored user, skipping");
                }
            }
        }
        Ok(None)
    }

    /// Fetch the user behind `profile`, creating the record on first
    /// contact.
    pub fn resolve(&self, profile: &UserProfile, admin_username: &str) -> Result<User, DbError> {
        if let Some(user) = self.fetch(profile.id)? {
            return Ok(user);
        }
        let user = User::from_profile(profile, admin_username);
        self.store(&user)?;
        info!(user_id = user.id, admin = user.admin, "Registered new user");
        Ok(user)
    }

    /// Set a user's status. Returns the updated record.
    pub fn set_status(&self, id: UserId, status: UserStatus) -> Result<Option<User>, DbError> {
        let Some(mut user) = self.fetch(id)? else {
            return Ok(None);
        };
        user.status = status;
        self.store(&user)?;
        Ok(Some(user))
    }

    /// Add match results to the derived counters.
    pub fn add_counters(&self, id: UserId, stars: u64, bonuses: u64) -> Result<(), DbError> {
        let Some(mut user) = self.fetch(id)? else {
            warn!(user_id = id, "Counters for unknown user dropped");
            return Ok(());
        };
        user.stars += stars;
        user.bonus_count += bonuses;
        self.store(&user)
    }

    pub fn cache(&self) -> &LruCache<UserId, User> {
        &self.cache
    }
}
