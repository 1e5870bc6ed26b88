//! # lexparty-proto
//!
//! The chat transport data model used by the lexparty game daemon, and the
//! Telegram Bot API wire codec that maps it to and from JSON.
//!
//! ## Features
//!
//! - Transport-neutral inbound [`Update`]s (text messages and callback queries)
//! - Outbound [`Sendable`] items (messages, edits, deletions, stickers, acks)
//! - Inline and reply keyboards with a small builder API
//! - Compact callback-data encoding for inline buttons
//! - Telegram `getUpdates` decoding and method/payload encoding
//!
//! ## Quick Start
//!
//! ```rust
//! use lexparty_proto::{InlineKeyboard, Sendable};
//!
//! let keyboard = InlineKeyboard::new()
//!     .row([("Ready", "ready")])
//!     .row([("Leave", "leave")]);
//! let msg = Sendable::text(42, "Your turn!").with_inline(keyboard);
//!
//! assert_eq!(msg.method(), "sendMessage");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod callback;
pub mod error;
pub mod keyboard;
pub mod sendable;
pub mod telegram;
pub mod types;
pub mod update;

pub use self::callback::CallbackData;
pub use self::error::ProtoError;
pub use self::keyboard::{InlineButton, InlineKeyboard, Markup, ReplyKeyboard};
pub use self::sendable::Sendable;
pub use self::types::{ChatId, MessageId, UserId, UserProfile};
pub use self::update::{CallbackQuery, IncomingMessage, Update};
