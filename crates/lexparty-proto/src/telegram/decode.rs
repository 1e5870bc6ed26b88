//! Inbound JSON decoding.

use crate::error::ProtoError;
use crate::types::{ChatId, MessageId, UserProfile};
use crate::update::{CallbackQuery, IncomingMessage, Update};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// The `{"ok": .., "result": ..}` envelope every API call returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Result payload on success.
    pub result: Option<T>,
    /// Error code on failure.
    pub error_code: Option<i64>,
    /// Error description on failure.
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Convert the envelope into a `Result`.
    pub fn into_result(self) -> Result<T, ProtoError> {
        if !self.ok {
            return Err(ProtoError::Api {
                code: self.error_code.unwrap_or(0),
                description: self.description.unwrap_or_default(),
            });
        }
        self.result.ok_or(ProtoError::MissingResult)
    }
}

/// Decode an API response body.
pub fn parse_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtoError> {
    let resp: ApiResponse<T> = serde_json::from_slice(body)?;
    resp.into_result()
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: ChatId,
    #[serde(rename = "type", default)]
    kind: String,
}

impl RawChat {
    fn is_group(&self) -> bool {
        matches!(self.kind.as_str(), "group" | "supergroup")
    }
}

/// A message as sent by the API. Only the fields the daemon reads.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    /// Id of the message.
    pub message_id: MessageId,
    #[serde(default)]
    from: Option<UserProfile>,
    chat: RawChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCallback {
    id: String,
    from: UserProfile,
    #[serde(default)]
    message: Option<SentMessage>,
    #[serde(default)]
    data: Option<String>,
}

/// One element of a `getUpdates` result or a webhook body.
#[derive(Debug, Deserialize)]
pub struct RawUpdate {
    /// Monotonic update id used as the polling offset.
    pub update_id: i64,
    #[serde(default)]
    message: Option<SentMessage>,
    #[serde(default)]
    callback_query: Option<RawCallback>,
}

impl RawUpdate {
    /// Convert into a transport-neutral update.
    ///
    /// Returns `None` for update kinds the daemon does not handle (edited
    /// messages, channel posts, messages without an author, callbacks
    /// detached from a message).
    pub fn into_update(self) -> Option<Update> {
        if let Some(msg) = self.message {
            let from = msg.from?;
            return Some(Update::Message(IncomingMessage {
                message_id: msg.message_id,
                chat_id: msg.chat.id,
                is_group: msg.chat.is_group(),
                from,
                text: msg.text.unwrap_or_default(),
            }));
        }
        let cb = self.callback_query?;
        let message = cb.message?;
        Some(Update::CallbackQuery(CallbackQuery {
            id: cb.id,
            from: cb.from,
            chat_id: message.chat.id,
            is_group: message.chat.is_group(),
            message_id: message.message_id,
            data: cb.data.unwrap_or_default(),
        }))
    }
}

/// Decode a `getUpdates` response into `(max update id, updates)`.
///
/// The max id is reported even when every update is skipped, so the
/// poller can still advance its offset.
pub fn parse_updates(body: &[u8]) -> Result<(Option<i64>, Vec<Update>), ProtoError> {
    let raw: Vec<RawUpdate> = parse_response(body)?;
    let last = raw.iter().map(|u| u.update_id).max();
    let updates = raw.into_iter().filter_map(RawUpdate::into_update).collect();
    Ok((last, updates))
}
