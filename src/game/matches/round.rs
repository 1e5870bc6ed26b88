//! Turn and round protocol.
//!
//! A turn runs: optional bonus roll, ready prompt (with warning and fatal
//! timers), letter reveal, countdown, timed answer, optional vote, then the
//! rate is appended and the score announced.

use super::{CallbackKind, MatchSession, MatchState, Signals, Vote};
use crate::game::player::favorites;
use crate::game::{Bonus, PlayerState, Rate};
use crate::metrics;
use crate::ui::{self, stickers};
use lexparty_proto::{ChatId, InlineKeyboard, Sendable, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Edits of the letter prompt before it settles.
const LETTER_FLIPS: usize = 10;
const LETTER_STEP: Duration = Duration::from_millis(300);
const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
const TICK: Duration = Duration::from_secs(1);
/// Pause after a score is announced.
const SCORE_PAUSE: Duration = Duration::from_secs(5);
/// Pause between a closed round and the next one.
const ROUND_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ready {
    Go,
    /// The player left during the prompt.
    Passed,
    /// The fatal timer fired.
    Idle,
    /// The prompt could not be delivered.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Stopped(u32),
    Expired,
    Passed,
    Lost,
}

impl MatchSession {
    /// Give every eligible player one turn, then close the round.
    pub(super) async fn play_round(self: &Arc<Self>, signals: &mut Signals) {
        loop {
            let eligible: Vec<UserId> = {
                let inner = self.inner.read();
                let round = inner.round as usize;
                inner
                    .players
                    .iter()
                    .filter(|p| p.is_eligible(round))
                    .map(|p| p.user_id)
                    .collect()
            };
            if eligible.is_empty() {
                self.transition(MatchState::Processing);
                return;
            }
            let user = eligible[self.deps.dice.index(eligible.len())];
            self.take_turn(user, signals).await;
        }
    }

    pub(super) async fn take_turn(self: &Arc<Self>, user: UserId, signals: &mut Signals) {
        signals.drain();
        // Claim the turn under the same lock `remove_player` takes, so a
        // departure either lands before the claim or sends a pass after it.
        let (chat, name) = {
            let mut inner = self.inner.write();
            let Some(player) = inner.players.iter().find(|p| p.user_id == user && p.is_playing()) else {
                return;
            };
            let seat = (player.chat_id, player.name.clone());
            inner.current = Some(user);
            inner.round_secs = self.config.round_secs;
            inner.bonus_points = 0;
            seat
        };
        debug!(code = self.code(), user_id = user, round = self.round(), "Turn started");

        let bonus = if self.config.bonus_enabled {
            self.roll_bonus(user, chat).await
        } else {
            None
        };

        match self.await_ready(user, chat, &name, signals).await {
            Ready::Go => {}
            Ready::Passed => return self.end_turn(),
            Ready::Idle | Ready::Lost => {
                self.set_leaving(user);
                self.broadcast_now(&ui::skipped(&name), None).await;
                return self.end_turn();
            }
        }

        let letter = self.reveal_letter(chat).await;
        self.broadcast_later(
            &ui::turn_announce(&name, letter, &self.config.categories),
            Some(user),
        )
        .await;
        self.countdown(chat).await;

        let started = Instant::now();
        let secs_left = match self.run_timer(user, chat, letter, signals).await {
            Timer::Stopped(secs) => secs,
            Timer::Expired => 0,
            Timer::Passed => return self.end_turn(),
            Timer::Lost => {
                self.set_leaving(user);
                self.broadcast_now(&ui::skipped(&name), None).await;
                return self.end_turn();
            }
        };
        let duration = started.elapsed();

        let bonus_points = self.inner.read().bonus_points;
        let (mut points, mut completed) = if secs_left > 0 {
            (i64::from(secs_left) + bonus_points, true)
        } else {
            (0, false)
        };

        if self.config.vote && points > 0 && !self.hold_vote(&name, letter).await {
            points = 0;
            completed = false;
        }

        self.append_rate(
            user,
            Rate {
                duration,
                points,
                completed,
                bonus: bonus.as_ref().map(|b| b.name.clone()),
            },
            bonus.as_ref(),
        );

        let sticker = if completed {
            stickers::COMPLETED
        } else {
            stickers::FAILED
        };
        self.send_now(Sendable::sticker(chat, sticker)).await;
        self.broadcast_later(&ui::score(&name, points), None).await;
        info!(code = self.code(), user_id = user, points, completed, "Turn rated");
        tokio::time::sleep(SCORE_PAUSE).await;
        self.end_turn();
    }

    fn end_turn(&self) {
        let mut inner = self.inner.write();
        inner.current = None;
        inner.round_secs = self.config.round_secs;
        inner.bonus_points = 0;
    }

    fn set_leaving(&self, user: UserId) {
        let mut inner = self.inner.write();
        if let Some(player) = inner.players.iter_mut().find(|p| p.user_id == user) {
            player.state = PlayerState::Leaving;
        }
    }

    /// Roll the bonus die and, on an award, draw from the remaining catalog.
    async fn roll_bonus(&self, user: UserId, chat: ChatId) -> Option<Bonus> {
        if self.inner.read().bonus_left.is_empty() {
            return None;
        }
        let rolling = self.send_now(Sendable::text(chat, ui::ROLLING)).await;
        if !self.deps.dice.bonus_roll() {
            if let Some(id) = rolling {
                self.send_now(Sendable::edit_text(chat, id, ui::NO_BONUS)).await;
            }
            return None;
        }

        let bonus = {
            let mut inner = self.inner.write();
            let idx = self
                .deps
                .dice
                .pick_bonus(self.config.bonus_policy, &inner.bonus_left)?;
            let bonus = inner.bonus_left.get(idx)?.clone();
            inner.round_secs = bonus.apply_seconds(self.config.round_secs);
            inner.bonus_points = bonus.points;
            bonus
        };
        info!(code = self.code(), user_id = user, bonus = %bonus.name, "Bonus drawn");

        if let Some(id) = rolling {
            self.send_now(Sendable::delete(chat, id)).await;
        }
        let prompt = Sendable::text(chat, ui::bonus_drawn(&bonus.name, &bonus.description))
            .with_inline(ui::bonus_keyboard());
        if let Some(id) = self.send_now(prompt).await {
            self.inner
                .write()
                .callbacks
                .register(id, CallbackKind::BonusAck, user);
        }
        Some(bonus)
    }

    async fn await_ready(&self, user: UserId, chat: ChatId, name: &str, signals: &mut Signals) -> Ready {
        let prompt = Sendable::text(chat, ui::READY_PROMPT).with_inline(ui::ready_keyboard());
        let Some(prompt_id) = self.send_now(prompt).await else {
            return Ready::Lost;
        };
        self.inner
            .write()
            .callbacks
            .register(prompt_id, CallbackKind::Ready, user);

        let warning = tokio::time::sleep(self.deps.timing.ready_warning);
        let fatal = tokio::time::sleep(self.deps.timing.ready_fatal);
        tokio::pin!(warning, fatal);
        let mut warned = false;

        let outcome = loop {
            tokio::select! {
                Some(()) = signals.ready.recv() => break Ready::Go,
                Some(passed) = signals.pass.recv() => {
                    if passed == user {
                        break Ready::Passed;
                    }
                }
                _ = &mut warning, if !warned => {
                    warned = true;
                    debug!(code = self.code(), user_id = user, "Ready warning");
                    self.send_now(Sendable::text(chat, ui::READY_NAG)).await;
                    self.broadcast_later(&ui::ready_nag_others(name), Some(user)).await;
                }
                _ = &mut fatal => break Ready::Idle,
            }
        };

        self.inner.write().callbacks.remove(prompt_id);
        self.send_now(Sendable::edit_keyboard(chat, prompt_id, InlineKeyboard::new()))
            .await;
        outcome
    }

    fn pick_letter(&self) -> char {
        let letters = &self.config.letters;
        letters
            .get(self.deps.dice.index(letters.len()))
            .copied()
            .unwrap_or('?')
    }

    async fn reveal_letter(&self, chat: ChatId) -> char {
        let message = self.send_now(Sendable::text(chat, ui::LETTER_PENDING)).await;
        let mut letter = self.pick_letter();
        for _ in 0..LETTER_FLIPS {
            tokio::time::sleep(LETTER_STEP).await;
            letter = self.pick_letter();
            if let Some(id) = message {
                self.send_now(Sendable::edit_text(chat, id, ui::letter(letter))).await;
            }
        }
        letter
    }

    async fn countdown(&self, chat: ChatId) {
        let message = self.send_now(Sendable::text(chat, ui::countdown(3))).await;
        for n in [2, 1] {
            tokio::time::sleep(COUNTDOWN_STEP).await;
            if let Some(id) = message {
                self.send_now(Sendable::edit_text(chat, id, ui::countdown(n))).await;
            }
        }
        tokio::time::sleep(COUNTDOWN_STEP).await;
        if let Some(id) = message {
            self.send_now(Sendable::edit_text(chat, id, ui::GO)).await;
        }
    }

    /// Tick the answer timer until the player stops it, it runs out or the
    /// player leaves.
    async fn run_timer(&self, user: UserId, chat: ChatId, letter: char, signals: &mut Signals) -> Timer {
        let secs = self.inner.read().round_secs;
        let message = Sendable::text(chat, ui::timer_started(letter, &self.config.categories))
            .with_inline(ui::timer_keyboard(secs));
        let Some(timer_id) = self.send_now(message).await else {
            return Timer::Lost;
        };
        self.inner
            .write()
            .callbacks
            .register(timer_id, CallbackKind::Stop, user);

        let mut secs_left = secs;
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let outcome = loop {
            tokio::select! {
                Some(()) = signals.stop.recv() => break Timer::Stopped(secs_left),
                Some(passed) = signals.pass.recv() => {
                    if passed == user {
                        break Timer::Passed;
                    }
                }
                _ = ticker.tick() => {
                    secs_left = secs_left.saturating_sub(1);
                    if secs_left == 0 {
                        break Timer::Expired;
                    }
                    self.send_now(Sendable::edit_keyboard(chat, timer_id, ui::timer_keyboard(secs_left)))
                        .await;
                }
            }
        };

        self.inner.write().callbacks.remove(timer_id);
        let left = match outcome {
            Timer::Stopped(secs) => secs,
            _ => 0,
        };
        self.send_now(Sendable::edit_text(chat, timer_id, ui::timer_stopped(left)))
            .await;
        outcome
    }

    /// Ask every alive player whether the answer stands. Returns the verdict.
    async fn hold_vote(&self, name: &str, letter: char) -> bool {
        let voters: Vec<(UserId, ChatId)> = self
            .inner
            .read()
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| (p.user_id, p.chat_id))
            .collect();
        let closed = {
            let vote = Vote::new(voters.iter().map(|(u, _)| *u));
            let closed = vote.closed();
            self.inner.write().vote = Some(vote);
            closed
        };

        let text = ui::vote_prompt(name, letter);
        for (voter, chat) in voters {
            let prompt = Sendable::text(chat, text.as_str()).with_inline(ui::vote_keyboard(0, 0));
            let sent = self.send_now(prompt).await;
            let mut inner = self.inner.write();
            match sent {
                Some(id) => {
                    inner.callbacks.register(id, CallbackKind::Vote, voter);
                    if let Some(vote) = inner.vote.as_mut() {
                        vote.track(chat, id);
                    }
                }
                None => {
                    if let Some(vote) = inner.vote.as_mut() {
                        vote.withdraw(voter);
                    }
                }
            }
        }

        let complete = self.inner.read().vote.as_ref().is_none_or(Vote::is_complete);
        if !complete {
            tokio::select! {
                _ = closed.notified() => {}
                _ = tokio::time::sleep(self.deps.timing.vote) => {
                    debug!(code = self.code(), "Vote timed out");
                }
            }
        }

        let (up, down, accepted, messages) = {
            let mut inner = self.inner.write();
            inner.callbacks.remove_kind(CallbackKind::Vote);
            match inner.vote.take() {
                Some(vote) => (vote.up(), vote.down(), vote.accepted(), vote.messages().to_vec()),
                None => (0, 0, true, Vec::new()),
            }
        };
        let verdict = ui::vote_closed(up, down, accepted);
        for (chat, id) in messages {
            self.send_now(Sendable::edit_text(chat, id, verdict.as_str())).await;
        }
        info!(code = self.code(), up, down, accepted, "Vote closed");
        accepted
    }

    fn append_rate(&self, user: UserId, rate: Rate, bonus: Option<&Bonus>) {
        let mut inner = self.inner.write();
        let round = inner.round as usize;
        let points = rate.points;
        if let Some(player) = inner.players.iter_mut().find(|p| p.user_id == user) {
            player.pad_rates(round);
            player.rates.push(rate);
        }
        if points > 0
            && let Some(bonus) = bonus
            && let Some(pos) = inner.bonus_left.iter().position(|b| b.name == bonus.name)
        {
            inner.bonus_left.remove(pos);
        }
    }

    /// Announce the closed round, then either finish or start the next one.
    pub(super) async fn close_round(&self) {
        let (round, alive) = {
            let inner = self.inner.read();
            (inner.round, inner.players.iter().any(|p| p.is_alive()))
        };
        self.broadcast_now(&ui::round_closed(round + 1), None).await;
        if round + 1 >= self.config.rounds || !alive {
            self.transition(MatchState::Finished);
            return;
        }
        tokio::time::sleep(ROUND_PAUSE).await;
        self.inner.write().round = round + 1;
        info!(code = self.code(), round = round + 1, "Next round");
        self.transition(MatchState::Playing);
    }

    /// Announce the favorites. The match then lingers until everyone leaves.
    pub(super) async fn finish(&self) {
        let players = self.players();
        let winners: Vec<String> = favorites(&players)
            .into_iter()
            .filter_map(|id| players.iter().find(|p| p.user_id == id))
            .map(|p| p.name.clone())
            .collect();
        let text = ui::results(&players, &winners);
        self.broadcast_now(&text, None).await;
        if !players.iter().any(|p| p.user_id == self.host()) {
            self.send_now(Sendable::text(self.host(), text)).await;
        }
        metrics::record_match_finished();
        info!(code = self.code(), winners = ?winners, "Match finished");
        if self.alive_count() == 0 {
            self.cancel.cancel();
        }
    }
}
