//! Telegram Bot API wire codec.
//!
//! [`decode`] turns `getUpdates`/webhook JSON into [`Update`]s and unwraps
//! the `{"ok": .., "result": ..}` envelope; [`encode`] produces the method
//! payload for a [`Sendable`].
//!
//! [`Update`]: crate::Update
//! [`Sendable`]: crate::Sendable

pub mod decode;
pub mod encode;

pub use self::decode::{parse_response, parse_updates, ApiResponse, RawUpdate, SentMessage};
pub use self::encode::get_updates_params;
