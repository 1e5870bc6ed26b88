//! Command handlers.
//!
//! This module contains the [`Handler`] trait and the command registry for
//! dispatching slash commands and menu buttons. A handler that needs a
//! follow-up text (a room code, a username, feedback) registers itself as
//! pending with [`Context::await_reply`]; the user's next plain message is
//! then passed to its [`Handler::resume`].

mod admin;
mod core;
mod info;
mod room;

pub use self::core::{Context, Handler, Registry};
