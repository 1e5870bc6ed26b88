//! Building session: the per-author wizard assembling a [`MatchConfig`].
//!
//! Each stage is entered by sending a fresh prompt with an inline keyboard
//! and deleting the previous one. Only clicks on the latest prompt count.
//! Updates are applied one at a time under an async mutex, so a slow send
//! never interleaves two clicks.

mod draft;

#[cfg(test)]
mod tests;

pub use draft::{Draft, Nav, STAGES, Stage};
#[cfg(test)]
pub use draft::{nav_data, option_data};

use super::{Bonus, BonusPolicy, Hooks, MatchConfig, WarnReason};
use crate::config::GameConfig;
use crate::error::HandlerResult;
use crate::metrics;
use crate::network::SharedTransport;
use crate::state::{StageMachine, User};
use crate::telemetry::spans;
use crate::ui::{self, data};
use lexparty_proto::{CallbackData, ChatId, MessageId, Sendable, Update, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

const CONFIGURED: &str = "Игра настроена.";

/// Options offered to every author.
#[derive(Debug, Clone, Default)]
pub struct BuilderDefaults {
    pub categories: Vec<String>,
    pub letters: Vec<char>,
    pub bonus: Vec<Bonus>,
    pub policy: BonusPolicy,
}

impl BuilderDefaults {
    pub fn from_config(game: &GameConfig) -> Self {
        Self {
            categories: game.categories.clone(),
            letters: game.letters(),
            bonus: game.bonus.clone(),
            policy: game.bonus_policy,
        }
    }
}

struct Inner {
    machine: StageMachine<Stage>,
    draft: Draft,
    /// Latest prompt; clicks on anything else are stale.
    prompt: Option<MessageId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    Done,
    Cancelled,
    Expired,
}

/// One author's wizard.
pub struct BuildingSession {
    author_id: UserId,
    author_name: String,
    chat_id: ChatId,
    bonus: Vec<Bonus>,
    policy: BonusPolicy,
    transport: SharedTransport,
    lifetime: Duration,
    hooks: Hooks<BuildingSession>,
    inner: tokio::sync::Mutex<Inner>,
    result: Mutex<Option<MatchConfig>>,
    done_tx: mpsc::Sender<()>,
    done_rx: Mutex<Option<mpsc::Receiver<()>>>,
    cancel: CancellationToken,
    parent: CancellationToken,
    stopped: AtomicBool,
}

impl BuildingSession {
    pub fn new(
        author: &User,
        defaults: BuilderDefaults,
        transport: SharedTransport,
        lifetime: Duration,
        hooks: Hooks<BuildingSession>,
        parent: &CancellationToken,
    ) -> Arc<Self> {
        let (done_tx, done_rx) = mpsc::channel(1);
        Arc::new(Self {
            author_id: author.id,
            author_name: author.display_name(),
            chat_id: author.chat_id(),
            inner: tokio::sync::Mutex::new(Inner {
                machine: StageMachine::new(&STAGES),
                draft: Draft::new(&defaults.categories, &defaults.letters),
                prompt: None,
            }),
            bonus: defaults.bonus,
            policy: defaults.policy,
            transport,
            lifetime,
            hooks,
            result: Mutex::new(None),
            done_tx,
            done_rx: Mutex::new(Some(done_rx)),
            cancel: parent.child_token(),
            parent: parent.clone(),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    /// The completed configuration, once the author confirmed it. The room
    /// code is left at zero for the caller to assign.
    pub fn config(&self) -> Option<MatchConfig> {
        self.result.lock().clone()
    }

    pub async fn stage(&self) -> Stage {
        self.inner.lock().await.machine.curr()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the wizard. Ends with `warn(Aborted)`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Send the first prompt and wait for confirmation, cancellation or the
    /// lifetime to run out. Calling it again is a no-op.
    pub async fn run(self: Arc<Self>) {
        let Some(mut done_rx) = self.done_rx.lock().take() else {
            debug!(user_id = self.author_id, "Builder already running");
            return;
        };
        let span = spans::building(self.author_id);
        async {
            info!(user_id = self.author_id, lifetime_secs = self.lifetime.as_secs(), "Builder running");
            {
                let mut inner = self.inner.lock().await;
                self.enter(&mut inner).await;
            }
            let ended = tokio::select! {
                _ = self.cancel.cancelled() => Ended::Cancelled,
                r = tokio::time::timeout(self.lifetime, done_rx.recv()) => match r {
                    Ok(Some(())) => Ended::Done,
                    Ok(None) => Ended::Cancelled,
                    Err(_) => Ended::Expired,
                },
            };
            self.cancel.cancel();
            self.teardown(ended).await;
        }
        .instrument(span)
        .await
    }

    async fn teardown(self: &Arc<Self>, ended: Ended) {
        if ended == Ended::Done {
            info!(user_id = self.author_id, "Builder done");
            (self.hooks.done)(Arc::clone(self)).await;
            return;
        }
        let reason = if ended == Ended::Expired {
            WarnReason::Timeout
        } else if self.stopped.load(Ordering::SeqCst) || !self.parent.is_cancelled() {
            WarnReason::Aborted
        } else {
            WarnReason::Shutdown
        };
        if reason == WarnReason::Timeout {
            let prompt = self.inner.lock().await.prompt.take();
            if let Some(id) = prompt {
                self.send(Sendable::delete(self.chat_id, id)).await;
            }
            self.send(Sendable::text(self.chat_id, ui::BUILDING_EXPIRED).with_menu(ui::main_menu()))
                .await;
        }
        info!(user_id = self.author_id, %reason, "Builder ended early");
        (self.hooks.warn)(Arc::clone(self), reason).await;
    }

    /// Apply one update from the author.
    pub async fn execute(&self, update: &Update) -> HandlerResult {
        let mut inner = self.inner.lock().await;
        if self.cancel.is_cancelled() || self.result.lock().is_some() {
            return Ok(());
        }
        match update {
            Update::Message(msg) => {
                if inner.machine.curr() == Stage::Categories && inner.draft.add_category(&msg.text) {
                    debug!(user_id = self.author_id, category = %msg.text.trim(), "Category added");
                    self.refresh(&inner).await;
                }
                Ok(())
            }
            Update::CallbackQuery(query) => {
                if inner.prompt != Some(query.message_id) {
                    debug!(user_id = self.author_id, message_id = query.message_id, "Stale builder click");
                    return Ok(());
                }
                let Ok(cb) = query.data.parse::<CallbackData>() else {
                    return Ok(());
                };
                match cb.tag.as_str() {
                    data::OPT => {
                        if let Some(idx) = cb.arg_as::<usize>() {
                            self.choose(&mut inner, idx).await;
                        }
                        Ok(())
                    }
                    data::NAV => match cb.arg.as_deref().and_then(Nav::parse) {
                        Some(nav) => self.navigate(&mut inner, nav).await,
                        None => Ok(()),
                    },
                    _ => Ok(()),
                }
            }
        }
    }

    async fn choose(&self, inner: &mut Inner, idx: usize) {
        let stage = inner.machine.curr();
        if !inner.draft.choose(stage, idx) {
            return;
        }
        if stage.is_toggle() {
            self.refresh(inner).await;
        } else {
            inner.machine.next();
            self.enter(inner).await;
        }
    }

    async fn navigate(&self, inner: &mut Inner, nav: Nav) -> HandlerResult {
        match nav {
            Nav::Prev if !inner.machine.is_min() => {
                inner.machine.prev();
                self.enter(inner).await;
            }
            Nav::Next if !inner.machine.is_max() => {
                inner.machine.next();
                self.enter(inner).await;
            }
            Nav::Done if inner.machine.is_max() => self.complete(inner).await?,
            _ => {}
        }
        Ok(())
    }

    /// Validate the draft and hand the configuration over.
    async fn complete(&self, inner: &mut Inner) -> HandlerResult {
        inner.draft.validate()?;
        let draft = &inner.draft;
        let config = MatchConfig {
            author_id: self.author_id,
            author_name: self.author_name.clone(),
            rounds: draft.rounds,
            round_secs: draft.round_secs,
            letters: draft.enabled_letters(),
            categories: draft.enabled_categories(),
            vote: draft.vote,
            bonus_enabled: draft.bonus,
            bonus: if draft.bonus { self.bonus.clone() } else { Vec::new() },
            bonus_policy: self.policy,
            code: 0,
        };
        *self.result.lock() = Some(config);
        if let Some(id) = inner.prompt.take() {
            self.send(Sendable::edit_text(self.chat_id, id, CONFIGURED)).await;
        }
        let _ = self.done_tx.try_send(());
        Ok(())
    }

    /// Send the prompt of the current stage and drop the previous one.
    async fn enter(&self, inner: &mut Inner) {
        let stage = inner.machine.curr();
        let keyboard = inner
            .draft
            .keyboard(stage, inner.machine.is_min(), inner.machine.is_max());
        let prompt = Sendable::text(self.chat_id, inner.draft.prompt(stage)).with_inline(keyboard);
        let sent = self.send(prompt).await;
        if let Some(old) = inner.prompt.take() {
            self.send(Sendable::delete(self.chat_id, old)).await;
        }
        inner.prompt = sent;
        debug!(user_id = self.author_id, ?stage, "Builder stage");
    }

    /// Redraw the keyboard of the current prompt.
    async fn refresh(&self, inner: &Inner) {
        let Some(id) = inner.prompt else { return };
        let stage = inner.machine.curr();
        let keyboard = inner
            .draft
            .keyboard(stage, inner.machine.is_min(), inner.machine.is_max());
        self.send(Sendable::edit_keyboard(self.chat_id, id, keyboard)).await;
    }

    async fn send(&self, msg: Sendable) -> Option<MessageId> {
        match self.transport.send(msg).await {
            Ok(id) => id,
            Err(e) => {
                metrics::record_send_failure();
                warn!(user_id = self.author_id, error = %e, "Builder send failed");
                None
            }
        }
    }
}
