//! Session creation, completion hooks, membership and restore.

use super::Manager;
use crate::db::{Outcome, StatRecord};
use crate::error::{HandlerError, HandlerResult};
use crate::game::code;
use crate::game::player::favorites;
use crate::game::{
    BuildingSession, Hooks, MatchConfig, MatchDeps, MatchSession, MatchState, WarnReason,
};
use crate::metrics;
use crate::state::User;
use crate::ui;
use dashmap::mapref::entry::Entry;
use futures_util::future::BoxFuture;
use lexparty_proto::{Sendable, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl Manager {
    /// Fail with `AlreadyBusy` if `user` is building, or is in a room other
    /// than `allowed`.
    pub fn ensure_free(&self, user: UserId, allowed: Option<u32>) -> HandlerResult {
        if self.building.contains_key(&user) {
            return Err(HandlerError::AlreadyBusy);
        }
        match self.membership.get(&user).map(|c| *c) {
            Some(code) if Some(code) != allowed => Err(HandlerError::AlreadyBusy),
            _ => Ok(()),
        }
    }

    /// Open the match builder for `user`.
    pub async fn create_building(&self, user: &User) -> HandlerResult {
        self.ensure_free(user.id, None)?;
        let defaults = self.defaults.read().clone();
        let session = BuildingSession::new(
            user,
            defaults,
            Arc::clone(&self.deps.transport),
            self.building_lifetime,
            self.building_hooks(),
            &self.sessions,
        );
        match self.building.entry(user.id) {
            Entry::Occupied(_) => return Err(HandlerError::AlreadyBusy),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&session));
            }
        }
        metrics::set_building_sessions(self.building.len());
        info!(user_id = user.id, "Builder opened");
        self.spawn_building(session);
        Ok(())
    }

    fn spawn_building(&self, session: Arc<BuildingSession>) {
        let me = self.me.clone();
        let user = session.author_id();
        let task = tokio::spawn(Arc::clone(&session).run());
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(user_id = user, error = %e, "Builder task failed");
                if let Some(manager) = me.upgrade() {
                    manager.release_building(&session);
                }
            }
        });
    }

    fn building_hooks(&self) -> Hooks<BuildingSession> {
        let done_me = self.me.clone();
        let warn_me = self.me.clone();
        Hooks {
            done: Arc::new(move |session: Arc<BuildingSession>| {
                let me = done_me.clone();
                Box::pin(async move {
                    if let Some(manager) = me.upgrade() {
                        manager.on_building_done(session).await;
                    }
                }) as BoxFuture<'static, ()>
            }),
            warn: Arc::new(move |session: Arc<BuildingSession>, reason: WarnReason| {
                let me = warn_me.clone();
                Box::pin(async move {
                    if let Some(manager) = me.upgrade() {
                        debug!(user_id = session.author_id(), %reason, "Builder discarded");
                        manager.release_building(&session);
                    }
                }) as BoxFuture<'static, ()>
            }),
        }
    }

    fn release_building(&self, session: &Arc<BuildingSession>) {
        self.building
            .remove_if(&session.author_id(), |_, s| Arc::ptr_eq(s, session));
        metrics::set_building_sessions(self.building.len());
    }

    async fn on_building_done(&self, session: Arc<BuildingSession>) {
        self.release_building(&session);
        let Some(config) = session.config() else {
            return;
        };
        if self.sessions.is_cancelled() {
            return;
        }
        let host = config.author_id;
        let match_session = self.open_match(config);
        let code = match_session.code();
        self.membership.insert(host, code);
        let reply = Sendable::text(host, ui::room_created(code)).with_menu(ui::host_menu());
        if let Err(e) = self.deps.transport.send(reply).await {
            metrics::record_send_failure();
            warn!(code, user_id = host, error = %e, "Room code not delivered");
        }
    }

    /// Register and start a match under a fresh code.
    fn open_match(&self, mut config: MatchConfig) -> Arc<MatchSession> {
        let clock = Arc::clone(&self.deps.clock);
        let session = loop {
            let code = code::allocate(|| clock(), |c| self.matches.contains_key(&c));
            if let Entry::Vacant(slot) = self.matches.entry(code) {
                config.code = code;
                let session = MatchSession::new(config, self.match_deps(), self.match_hooks(), &self.sessions);
                slot.insert(Arc::clone(&session));
                break session;
            }
        };
        metrics::set_active_matches(self.matches.len());
        info!(code = session.code(), host = session.host(), "Match opened");
        self.spawn_match(Arc::clone(&session));
        session
    }

    fn match_deps(&self) -> MatchDeps {
        MatchDeps {
            transport: Arc::clone(&self.deps.transport),
            dice: Arc::clone(&self.deps.dice),
            timing: self.timing,
        }
    }

    fn spawn_match(&self, session: Arc<MatchSession>) {
        let me = self.me.clone();
        let code = session.code();
        let task = tokio::spawn(Arc::clone(&session).run());
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(code, error = %e, "Match task failed");
                if let Some(manager) = me.upgrade() {
                    manager.release_match(&session);
                }
            }
        });
    }

    fn match_hooks(&self) -> Hooks<MatchSession> {
        let done_me = self.me.clone();
        let warn_me = self.me.clone();
        Hooks {
            done: Arc::new(move |session: Arc<MatchSession>| {
                let me = done_me.clone();
                Box::pin(async move {
                    if let Some(manager) = me.upgrade() {
                        manager.on_match_done(session);
                    }
                }) as BoxFuture<'static, ()>
            }),
            warn: Arc::new(move |session: Arc<MatchSession>, reason: WarnReason| {
                let me = warn_me.clone();
                Box::pin(async move {
                    if let Some(manager) = me.upgrade() {
                        manager.on_match_warn(session, reason);
                    }
                }) as BoxFuture<'static, ()>
            }),
        }
    }

    /// Drop a match and every membership pointing at it.
    fn release_match(&self, session: &Arc<MatchSession>) {
        let code = session.code();
        if self
            .matches
            .remove_if(&code, |_, s| Arc::ptr_eq(s, session))
            .is_some()
        {
            self.membership.retain(|_, c| *c != code);
        }
        metrics::set_active_matches(self.matches.len());
    }

    /// Persist per-player statistics of a finished match.
    fn on_match_done(&self, session: Arc<MatchSession>) {
        let players = session.players();
        let winners = favorites(&players);
        for player in players.iter().filter(|p| !p.rates.is_empty()) {
            let outcome = if winners.contains(&player.user_id) {
                Outcome::Favorite
            } else {
                Outcome::Participant
            };
            let record = StatRecord::from_rates(
                player.user_id,
                &player.rates,
                outcome,
                session.config(),
                players.len(),
            );
            if let Err(e) = self.db.stats().append(&record) {
                warn!(code = session.code(), user_id = player.user_id, error = %e, "Stat record not saved");
                continue;
            }
            let stars = u64::from(outcome == Outcome::Favorite);
            let bonuses = player.rates.iter().filter(|r| r.bonus.is_some()).count() as u64;
            if let Err(e) = self.db.users().add_counters(player.user_id, stars, bonuses) {
                warn!(code = session.code(), user_id = player.user_id, error = %e, "User counters not updated");
            }
        }
        info!(code = session.code(), players = players.len(), "Match stats recorded");
        self.release_match(&session);
    }

    fn on_match_warn(&self, session: Arc<MatchSession>, reason: WarnReason) {
        if reason == WarnReason::Shutdown {
            let snapshot = session.snapshot();
            match self.db.snapshots().save(&snapshot) {
                Ok(()) => {
                    metrics::record_snapshot();
                    info!(code = snapshot.code, state = ?snapshot.state, "Match snapshotted");
                }
                Err(e) => error!(code = snapshot.code, error = %e, "Match snapshot failed"),
            }
        }
        self.release_match(&session);
    }

    /// Join the room behind `code_text`. Returns the room code.
    pub async fn join(&self, user: &User, code_text: &str) -> Result<u32, HandlerError> {
        let code_text = code_text.trim();
        let code: u32 = code_text
            .parse()
            .map_err(|_| HandlerError::BadCode(code_text.to_string()))?;
        let session = self
            .match_by_code(code)
            .ok_or(HandlerError::UnknownCode(code))?;
        self.ensure_free(user.id, Some(code))?;
        session
            .add_player(user.id, user.chat_id(), &user.display_name())
            .await?;
        self.membership.insert(user.id, code);
        Ok(code)
    }

    /// Leave the builder or the current room. A host leaving a room that
    /// has not started closes it.
    pub async fn leave(&self, user: &User) -> HandlerResult {
        self.pending.remove(&user.id);
        if let Some(builder) = self.building_of(user.id) {
            builder.stop();
            self.release_building(&builder);
            return Ok(());
        }
        let session = self.match_of(user.id).ok_or(HandlerError::NotInGame)?;
        self.membership.remove(&user.id);
        if session.host() == user.id && session.state() == MatchState::Waiting {
            info!(code = session.code(), "Host closed the room");
            session.stop();
            return Ok(());
        }
        session.remove_player(user.id).await;
        Ok(())
    }

    /// Rebuild every snapshotted match, then drop the snapshots.
    pub fn restore(&self) {
        let snapshots = match self.db.snapshots().load_all() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!(error = %e, "Snapshots not readable, skipping restore");
                return;
            }
        };
        let restored = snapshots.len();
        for snapshot in snapshots {
            let code = snapshot.code;
            if self.matches.contains_key(&code) {
                warn!(code, "Snapshot code already live, skipped");
                continue;
            }
            let host = snapshot.config.author_id;
            let members: Vec<UserId> = snapshot
                .players
                .iter()
                .filter(|p| p.is_playing())
                .map(|p| p.user_id)
                .collect();
            let session = MatchSession::restore(snapshot, self.match_deps(), self.match_hooks(), &self.sessions);
            self.matches.insert(code, Arc::clone(&session));
            self.membership.insert(host, code);
            for member in members {
                self.membership.insert(member, code);
            }
            info!(code, state = ?session.state(), round = session.round(), "Match restored");
            self.spawn_match(session);
        }
        metrics::set_active_matches(self.matches.len());
        if let Err(e) = self.db.snapshots().drop_all() {
            warn!(error = %e, "Snapshots not dropped after restore");
        }
        if restored > 0 {
            info!(restored, "Restore complete");
        }
    }
}
