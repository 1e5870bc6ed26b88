//! Manager: owner of every session and the single inbound dispatcher.
//!
//! # Architecture
//!
//! - **Maps**: building sessions keyed by author, matches keyed by room
//!   code, and a membership map from user to room code (hosts and players).
//!   All three are [`DashMap`]s so dispatch workers never contend on one lock.
//! - **Sessions** never see the manager. They get [`Hooks`](crate::game::Hooks)
//!   capturing a `Weak<Manager>` and release their own map slots from there.
//! - **Workers**: `run` spawns one dispatch worker per CPU, all draining the
//!   same update channel.
//! - **Shutdown** cancels the session parent token; every live match then
//!   ends with `warn(Shutdown)` and is snapshotted before its slot is freed.

mod dispatch;
mod lifecycle;

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::Database;
use crate::game::code;
use crate::game::{
    BuilderDefaults, BuildingSession, Dice, MatchSession, MatchTiming, ThreadDice,
};
use crate::handlers::Registry;
use crate::network::SharedTransport;
use dashmap::DashMap;
use lexparty_proto::{Update, UserId};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Interval between checks that every session has released its slot.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Longest wait for sessions to release their slots at shutdown.
const SHUTDOWN_WINDOW: Duration = Duration::from_secs(10);

/// Source of timestamps for room codes, in nanoseconds.
pub type Clock = Arc<dyn Fn() -> u128 + Send + Sync>;

/// Collaborators of the manager.
#[derive(Clone)]
pub struct ManagerDeps {
    pub transport: SharedTransport,
    pub dice: Arc<dyn Dice>,
    pub clock: Clock,
}

impl ManagerDeps {
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            dice: Arc::new(ThreadDice),
            clock: Arc::new(code::now_nanos),
        }
    }
}

/// The process-wide session coordinator.
pub struct Manager {
    me: Weak<Manager>,
    db: Arc<Database>,
    deps: ManagerDeps,
    registry: Registry,
    admin_username: String,
    building_lifetime: Duration,
    timing: MatchTiming,
    defaults: RwLock<BuilderDefaults>,
    building: DashMap<UserId, Arc<BuildingSession>>,
    matches: DashMap<u32, Arc<MatchSession>>,
    membership: DashMap<UserId, u32>,
    /// Commands waiting for the user's next plain text.
    pending: DashMap<UserId, &'static str>,
    /// Parent token of every session.
    sessions: CancellationToken,
}

impl Manager {
    pub fn new(config: &Config, db: Arc<Database>, deps: ManagerDeps) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            db,
            deps,
            registry: Registry::new(),
            admin_username: config.bot.admin_username.clone(),
            building_lifetime: config.timeouts.building(),
            timing: MatchTiming::from_config(&config.timeouts),
            defaults: RwLock::new(BuilderDefaults::from_config(&config.game)),
            building: DashMap::new(),
            matches: DashMap::new(),
            membership: DashMap::new(),
            pending: DashMap::new(),
            sessions: CancellationToken::new(),
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.deps.transport
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn building_count(&self) -> usize {
        self.building.len()
    }

    /// The match `user` hosts or plays in.
    pub fn match_of(&self, user: UserId) -> Option<Arc<MatchSession>> {
        let code = *self.membership.get(&user)?;
        self.matches.get(&code).map(|m| Arc::clone(m.value()))
    }

    pub fn match_by_code(&self, code: u32) -> Option<Arc<MatchSession>> {
        self.matches.get(&code).map(|m| Arc::clone(m.value()))
    }

    pub fn building_of(&self, user: UserId) -> Option<Arc<BuildingSession>> {
        self.building.get(&user).map(|b| Arc::clone(b.value()))
    }

    pub(crate) fn set_pending(&self, user: UserId, command: &'static str) {
        self.pending.insert(user, command);
    }

    /// Append a category to the builder defaults. Returns false for blank or
    /// duplicate names.
    pub fn add_category(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let mut defaults = self.defaults.write();
        if defaults
            .categories
            .iter()
            .any(|c| c.to_lowercase() == name.to_lowercase())
        {
            return false;
        }
        defaults.categories.push(name.to_string());
        true
    }

    pub fn default_categories(&self) -> Vec<String> {
        self.defaults.read().categories.clone()
    }

    /// Restore persisted matches, dispatch updates until `shutdown` fires,
    /// then wind every session down.
    pub async fn run(self: Arc<Self>, updates: mpsc::Receiver<Update>, shutdown: CancellationToken) {
        self.restore();

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let updates = Arc::new(Mutex::new(updates));
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let manager = Arc::clone(&self);
            let updates = Arc::clone(&updates);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = shutdown.cancelled() => None,
                        update = async { updates.lock().await.recv().await } => update,
                    };
                    let Some(update) = next else { break };
                    manager.dispatch(update).await;
                }
                tracing::debug!(worker, "Dispatch worker stopped");
            }));
        }
        info!(workers, "Manager running");

        shutdown.cancelled().await;
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatch worker failed");
            }
        }
        self.shutdown().await;
    }

    /// Cancel every session and wait, bounded, for their slots to clear.
    pub async fn shutdown(&self) {
        info!(
            matches = self.matches.len(),
            building = self.building.len(),
            "Shutting down sessions"
        );
        self.sessions.cancel();
        let deadline = tokio::time::Instant::now() + SHUTDOWN_WINDOW;
        while !(self.matches.is_empty() && self.building.is_empty()) {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    matches = self.matches.len(),
                    building = self.building.len(),
                    "Sessions still live after shutdown window"
                );
                return;
            }
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
        info!("All sessions released");
    }
}
