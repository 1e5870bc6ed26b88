//! Match session: the engine driving one room from `waiting` to `finished`.
//!
//! # Architecture
//!
//! - **State ownership**: players, rates, the callback table, the vote and
//!   the current-turn fields live in one [`parking_lot::RwLock`]; the lock is
//!   never held across an await.
//! - **Loop**: [`MatchSession::run`] consumes a capacity-1 state channel and
//!   performs the work of each state (turns, round closing, results).
//! - **Signals**: clicks arrive through [`MatchSession::execute`] and are
//!   forwarded to the loop on capacity-1 `ready`/`stop`/`pass` channels.
//! - **Exit**: exactly one hook fires. `done` once the match has finished,
//!   `warn` otherwise, with the reason (shutdown, timeout or abort).

mod broadcast;
mod callbacks;
mod round;
pub(crate) mod snapshot;
mod vote;


pub use broadcast::Outbox;
pub use callbacks::{CallbackKind, CallbackTable};
pub use snapshot::MatchSnapshot;
pub use vote::Vote;

use super::{Bonus, Dice, Hooks, MatchConfig, Player, PlayerState, WarnReason};
use crate::config::TimeoutsConfig;
use crate::error::HandlerError;
use crate::network::SharedTransport;
use crate::telemetry::spans;
use crate::ui::{self, buttons, data};
use chrono::{DateTime, Utc};
use lexparty_proto::{CallbackQuery, ChatId, InlineKeyboard, Sendable, Update, UserId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Waiting,
    Playing,
    Processing,
    Finished,
}

/// Timers of a match.
#[derive(Debug, Clone, Copy)]
pub struct MatchTiming {
    /// Lifetime of a match.
    pub lifetime: Duration,
    /// Idle time before the active player is nagged.
    pub ready_warning: Duration,
    /// Idle time before the active player is skipped.
    pub ready_fatal: Duration,
    /// How long a vote stays open.
    pub vote: Duration,
}

impl MatchTiming {
    pub fn from_config(timeouts: &TimeoutsConfig) -> Self {
        Self {
            lifetime: timeouts.matches(),
            ready_warning: timeouts.ready_warning(),
            ready_fatal: timeouts.ready_fatal(),
            vote: timeouts.vote(),
        }
    }
}

impl Default for MatchTiming {
    fn default() -> Self {
        Self::from_config(&TimeoutsConfig::default())
    }
}

/// Collaborators shared by every match.
#[derive(Clone)]
pub struct MatchDeps {
    pub transport: SharedTransport,
    pub dice: Arc<dyn Dice>,
    pub timing: MatchTiming,
}

struct Inner {
    state: MatchState,
    round: u32,
    players: Vec<Player>,
    callbacks: CallbackTable,
    bonus_left: Vec<Bonus>,
    /// Seconds of the current turn after bonus adjustment.
    round_secs: u32,
    /// Points added when the current turn succeeds.
    bonus_points: i64,
    /// Player whose turn is in progress.
    current: Option<UserId>,
    vote: Option<Vote>,
}

/// Receiving halves, owned by the running loop.
struct Signals {
    state: mpsc::Receiver<MatchState>,
    ready: mpsc::Receiver<()>,
    stop: mpsc::Receiver<()>,
    pass: mpsc::Receiver<UserId>,
}

impl Signals {
    /// Discard clicks left over from an earlier turn.
    fn drain(&mut self) {
        while self.ready.try_recv().is_ok() {}
        while self.stop.try_recv().is_ok() {}
        while self.pass.try_recv().is_ok() {}
    }
}

/// How the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    Cancelled,
    Expired,
    Drained,
}

/// One room.
pub struct MatchSession {
    config: MatchConfig,
    created_at: DateTime<Utc>,
    /// Lifetime left when the session was built.
    lifetime: Duration,
    deps: MatchDeps,
    hooks: Hooks<MatchSession>,
    inner: RwLock<Inner>,
    state_tx: mpsc::Sender<MatchState>,
    ready_tx: mpsc::Sender<()>,
    stop_tx: mpsc::Sender<()>,
    pass_tx: mpsc::Sender<UserId>,
    signals: Mutex<Option<Signals>>,
    outbox: Outbox,
    /// Serializes vote tally edits.
    tally: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    parent: CancellationToken,
    stopped: AtomicBool,
}

impl MatchSession {
    /// Create a match in the `waiting` state.
    pub fn new(
        config: MatchConfig,
        deps: MatchDeps,
        hooks: Hooks<MatchSession>,
        parent: &CancellationToken,
    ) -> Arc<Self> {
        let inner = Inner {
            state: MatchState::Waiting,
            round: 0,
            players: Vec::new(),
            callbacks: CallbackTable::default(),
            bonus_left: if config.bonus_enabled {
                config.bonus.clone()
            } else {
                Vec::new()
            },
            round_secs: config.round_secs,
            bonus_points: 0,
            current: None,
            vote: None,
        };
        let lifetime = deps.timing.lifetime;
        Self::build(config, Utc::now(), lifetime, inner, deps, hooks, parent)
    }

    /// Rebuild a match from its snapshot. A `playing` or `processing` state
    /// is replayed as soon as the session runs.
    pub fn restore(
        snapshot: MatchSnapshot,
        deps: MatchDeps,
        hooks: Hooks<MatchSession>,
        parent: &CancellationToken,
    ) -> Arc<Self> {
        let lifetime = snapshot.remaining(Utc::now());
        let state = snapshot.state;
        let inner = Inner {
            state,
            round: snapshot.round,
            players: snapshot.players,
            callbacks: CallbackTable::default(),
            bonus_left: snapshot.bonus_left,
            round_secs: snapshot.config.round_secs,
            bonus_points: 0,
            current: None,
            vote: None,
        };
        let session = Self::build(
            snapshot.config,
            snapshot.created_at,
            lifetime,
            inner,
            deps,
            hooks,
            parent,
        );
        if matches!(state, MatchState::Playing | MatchState::Processing) {
            session.push_state(state);
        }
        session
    }

    fn build(
        config: MatchConfig,
        created_at: DateTime<Utc>,
        lifetime: Duration,
        inner: Inner,
        deps: MatchDeps,
        hooks: Hooks<MatchSession>,
        parent: &CancellationToken,
    ) -> Arc<Self> {
        let (state_tx, state) = mpsc::channel(1);
        let (ready_tx, ready) = mpsc::channel(1);
        let (stop_tx, stop) = mpsc::channel(1);
        let (pass_tx, pass) = mpsc::channel(1);
        Arc::new(Self {
            config,
            created_at,
            lifetime,
            deps,
            hooks,
            inner: RwLock::new(inner),
            state_tx,
            ready_tx,
            stop_tx,
            pass_tx,
            signals: Mutex::new(Some(Signals {
                state,
                ready,
                stop,
                pass,
            })),
            outbox: Outbox::new(),
            tally: tokio::sync::Mutex::new(()),
            cancel: parent.child_token(),
            parent: parent.clone(),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn code(&self) -> u32 {
        self.config.code
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn host(&self) -> UserId {
        self.config.author_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> MatchState {
        self.inner.read().state
    }

    pub fn round(&self) -> u32 {
        self.inner.read().round
    }

    pub fn players(&self) -> Vec<Player> {
        self.inner.read().players.clone()
    }

    pub fn player(&self, user: UserId) -> Option<Player> {
        self.inner
            .read()
            .players
            .iter()
            .find(|p| p.user_id == user)
            .cloned()
    }

    pub fn bonus_left(&self) -> Vec<Bonus> {
        self.inner.read().bonus_left.clone()
    }

    pub fn alive_count(&self) -> usize {
        self.inner.read().players.iter().filter(|p| p.is_alive()).count()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the match. Ends with `warn(Aborted)` unless it has finished.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn push_state(&self, state: MatchState) {
        if self.state_tx.try_send(state).is_err() {
            warn!(code = self.code(), ?state, "State channel full, transition dropped");
        }
    }

    /// Record and signal a state change.
    fn transition(&self, state: MatchState) {
        self.inner.write().state = state;
        debug!(code = self.code(), ?state, "Match transition");
        self.push_state(state);
    }

    /// Drive the match until it is cancelled or its lifetime runs out, then
    /// invoke exactly one hook. Calling it again is a no-op.
    pub async fn run(self: Arc<Self>) {
        let Some(mut signals) = self.signals.lock().take() else {
            debug!(code = self.code(), "Match already running");
            return;
        };
        let span = spans::session(self.code());
        async {
            let workers = self
                .outbox
                .spawn_workers(Arc::clone(&self.deps.transport), self.code());
            info!(code = self.code(), lifetime_secs = self.lifetime.as_secs(), "Match running");

            let ended = tokio::select! {
                _ = self.cancel.cancelled() => Ended::Cancelled,
                r = tokio::time::timeout(self.lifetime, self.drive(&mut signals)) => match r {
                    Ok(()) => Ended::Drained,
                    Err(_) => Ended::Expired,
                },
            };
            self.cancel.cancel();
            self.outbox.close();
            for worker in workers {
                let _ = worker.await;
            }
            self.teardown(ended).await;
        }
        .instrument(span)
        .await
    }

    async fn drive(self: &Arc<Self>, signals: &mut Signals) {
        while let Some(state) = signals.state.recv().await {
            match state {
                MatchState::Waiting => {}
                MatchState::Playing => self.play_round(signals).await,
                MatchState::Processing => self.close_round().await,
                MatchState::Finished => self.finish().await,
            }
        }
    }

    async fn teardown(self: &Arc<Self>, ended: Ended) {
        let state = self.state();
        if state == MatchState::Finished {
            info!(code = self.code(), "Match done");
            (self.hooks.done)(Arc::clone(self)).await;
            return;
        }
        let reason = if ended == Ended::Expired {
            WarnReason::Timeout
        } else if self.stopped.load(Ordering::SeqCst) {
            WarnReason::Aborted
        } else if self.parent.is_cancelled() {
            WarnReason::Shutdown
        } else {
            WarnReason::Aborted
        };
        match reason {
            WarnReason::Timeout => self.broadcast_now(ui::MATCH_EXPIRED, None).await,
            WarnReason::Aborted => self.broadcast_now(ui::MATCH_ABORTED, None).await,
            WarnReason::Shutdown => {}
        }
        info!(code = self.code(), ?state, %reason, "Match ended early");
        (self.hooks.warn)(Arc::clone(self), reason).await;
    }

    /// Apply an update from `user`. Returns whether the match consumed it.
    pub async fn execute(self: &Arc<Self>, user: UserId, update: &Update) -> Result<bool, HandlerError> {
        match update {
            Update::Message(msg) => match msg.text.trim() {
                buttons::START => {
                    self.start_by(user).await?;
                    Ok(true)
                }
                buttons::RATING => {
                    let text = ui::rating(&self.players());
                    self.send_now(Sendable::text(msg.chat_id, text)).await;
                    Ok(true)
                }
                buttons::SETTINGS => {
                    self.send_now(Sendable::text(msg.chat_id, self.config.summary())).await;
                    Ok(true)
                }
                _ => Ok(false),
            },
            Update::CallbackQuery(query) => {
                self.on_callback(user, query).await;
                Ok(true)
            }
        }
    }

    /// Host starts the match.
    async fn start_by(self: &Arc<Self>, user: UserId) -> Result<(), HandlerError> {
        {
            let mut inner = self.inner.write();
            if user != self.config.author_id {
                return Err(HandlerError::NotHost);
            }
            if inner.state != MatchState::Waiting {
                return Err(HandlerError::AlreadyStarted);
            }
            if !inner.players.iter().any(Player::is_playing) {
                return Err(HandlerError::NoPlayers);
            }
            inner.state = MatchState::Playing;
        }
        info!(code = self.code(), "Match started by host");
        let text = ui::match_started(1, self.config.rounds);
        self.broadcast_now(&text, None).await;
        if !self.is_player(self.host()) {
            self.send_now(Sendable::text(self.host(), text)).await;
        }
        self.push_state(MatchState::Playing);
        Ok(())
    }

    fn is_player(&self, user: UserId) -> bool {
        self.inner.read().players.iter().any(|p| p.user_id == user)
    }

    async fn on_callback(&self, user: UserId, query: &CallbackQuery) {
        enum Action {
            Signal(CallbackKind),
            Clear,
            Tally,
            Ignore,
        }

        let action = {
            let mut inner = self.inner.write();
            let Some(entry) = inner.callbacks.accept(query.message_id, user, &query.data) else {
                debug!(code = self.code(), user_id = user, message_id = query.message_id, "Stale callback ignored");
                return;
            };
            match entry.kind {
                CallbackKind::Ready | CallbackKind::Stop => Action::Signal(entry.kind),
                CallbackKind::BonusAck => Action::Clear,
                CallbackKind::Vote => match inner.vote.as_mut() {
                    Some(vote) => {
                        if vote.cast(user, query.data == data::VOTE_UP) {
                            vote.notify_if_complete();
                            Action::Tally
                        } else {
                            Action::Ignore
                        }
                    }
                    None => Action::Ignore,
                },
            }
        };

        match action {
            Action::Signal(kind) => {
                let tx = if kind == CallbackKind::Ready {
                    &self.ready_tx
                } else {
                    &self.stop_tx
                };
                let _ = tx.try_send(());
            }
            Action::Clear => {
                self.send_now(Sendable::edit_keyboard(
                    query.chat_id,
                    query.message_id,
                    InlineKeyboard::new(),
                ))
                .await;
            }
            Action::Tally => {
                // Counts are read after taking the fan-out lock, so the
                // last edit on every prompt carries the latest tally.
                let _fanout = self.tally.lock().await;
                let tally = self
                    .inner
                    .read()
                    .vote
                    .as_ref()
                    .map(|v| (v.messages().to_vec(), v.up(), v.down()));
                let Some((messages, up, down)) = tally else {
                    return;
                };
                for (chat_id, message_id) in messages {
                    self.send_now(Sendable::edit_keyboard(chat_id, message_id, ui::vote_keyboard(up, down)))
                        .await;
                }
            }
            Action::Ignore => {}
        }
    }

    /// Admit a player, or re-admit one who left. Idempotent for a player
    /// already playing. Late joiners get zero rates for missed rounds.
    pub async fn add_player(&self, user: UserId, chat_id: ChatId, name: &str) -> Result<(), HandlerError> {
        let admitted = {
            let mut inner = self.inner.write();
            if inner.state == MatchState::Finished {
                return Err(HandlerError::MatchNotJoinable(self.code()));
            }
            let round = inner.round as usize;
            let started = inner.state != MatchState::Waiting;
            match inner.players.iter_mut().find(|p| p.user_id == user) {
                Some(player) if player.is_playing() => {
                    player.chat_id = chat_id;
                    player.name = name.to_string();
                    player.offline = false;
                    false
                }
                Some(player) => {
                    player.chat_id = chat_id;
                    player.name = name.to_string();
                    player.state = PlayerState::Playing;
                    player.offline = false;
                    if started {
                        player.pad_rates(round);
                    }
                    true
                }
                None => {
                    let mut player = Player::new(user, chat_id, name);
                    if started {
                        player.pad_rates(round);
                    }
                    inner.players.push(player);
                    true
                }
            }
        };
        if admitted {
            info!(code = self.code(), user_id = user, "Player joined");
            self.broadcast_later(&ui::player_joined(name), Some(user)).await;
        }
        Ok(())
    }

    /// Mark a player as leaving. Skips their turn when it is in progress,
    /// withdraws their vote and ends a finished match once nobody is left.
    pub async fn remove_player(&self, user: UserId) -> bool {
        let (name, finished_empty) = {
            let mut inner = self.inner.write();
            let Some(player) = inner.players.iter_mut().find(|p| p.user_id == user) else {
                return false;
            };
            player.state = PlayerState::Leaving;
            let name = player.name.clone();

            if inner.current == Some(user) {
                let _ = self.pass_tx.try_send(user);
            }
            if let Some(vote) = inner.vote.as_mut()
                && vote.withdraw(user)
            {
                vote.notify_if_complete();
            }
            let alive = inner.players.iter().any(Player::is_alive);
            (name, inner.state == MatchState::Finished && !alive)
        };
        info!(code = self.code(), user_id = user, "Player left");
        self.broadcast_later(&ui::player_left(&name), Some(user)).await;
        if finished_empty {
            self.cancel.cancel();
        }
        true
    }
}
