//! Game sessions.
//!
//! - [`building`]: the per-author wizard producing a [`MatchConfig`]
//! - [`matches`]: the round-by-round engine for one room
//! - [`bonus`], [`dice`], [`code`], [`player`]: shared pieces
//!
//! Sessions never reference the manager. They receive [`Hooks`] at
//! construction and invoke exactly one of them when their run loop ends.

pub mod bonus;
pub mod building;
pub mod code;
pub mod config;
pub mod dice;
pub mod matches;
pub mod player;

pub use bonus::{Bonus, BonusPolicy};
pub use building::{BuilderDefaults, BuildingSession};
pub use config::MatchConfig;
pub use dice::{Dice, ThreadDice};
#[cfg(test)]
pub use dice::ScriptedDice;
pub use matches::{MatchDeps, MatchSession, MatchSnapshot, MatchState, MatchTiming};
pub use player::{Player, PlayerState, Rate};

use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Why a session ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnReason {
    /// The daemon is shutting down; in-flight matches are snapshotted.
    Shutdown,
    /// The session outlived its configured lifetime.
    Timeout,
    /// The session was stopped explicitly.
    Aborted,
}

impl WarnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Timeout => "timeout",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for WarnReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoked when a session completes.
pub type DoneHook<S> = Arc<dyn Fn(Arc<S>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Invoked when a session ends without completing.
pub type WarnHook<S> = Arc<dyn Fn(Arc<S>, WarnReason) -> BoxFuture<'static, ()> + Send + Sync>;

/// Completion callbacks handed to a session.
pub struct Hooks<S> {
    pub done: DoneHook<S>,
    pub warn: WarnHook<S>,
}

impl<S> Clone for Hooks<S> {
    fn clone(&self) -> Self {
        Self {
            done: Arc::clone(&self.done),
            warn: Arc::clone(&self.warn),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hooks reporting into a channel.

    use super::*;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Ended {
        Done,
        Warn(WarnReason),
    }

    pub fn recording_hooks<S: Send + Sync + 'static>() -> (Hooks<S>, mpsc::UnboundedReceiver<Ended>)
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let done_tx = tx.clone();
        let hooks = Hooks {
            done: Arc::new(move |_session: Arc<S>| {
                let tx = done_tx.clone();
                Box::pin(async move {
                    let _ = tx.send(Ended::Done);
                }) as BoxFuture<'static, ()>
            }),
            warn: Arc::new(move |_session: Arc<S>, reason| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx.send(Ended::Warn(reason));
                }) as BoxFuture<'static, ()>
            }),
        };
        (hooks, rx)
    }
}
