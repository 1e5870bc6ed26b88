//! Inbound updates.

use crate::types::{ChatId, MessageId, UserId, UserProfile};
use serde::{Deserialize, Serialize};

/// A text message sent by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Id of this message in its chat.
    pub message_id: MessageId,
    /// Chat the message was posted to.
    pub chat_id: ChatId,
    /// Author.
    pub from: UserProfile,
    /// Message text (empty for non-text messages).
    pub text: String,
    /// Whether the chat is a group or supergroup.
    pub is_group: bool,
}

/// A tap on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query id, used to acknowledge the tap.
    pub id: String,
    /// User that tapped the button.
    pub from: UserProfile,
    /// Chat holding the message the keyboard was attached to.
    pub chat_id: ChatId,
    /// Id of the message the keyboard was attached to.
    pub message_id: MessageId,
    /// Callback data of the button.
    pub data: String,
    /// Whether the keyboard was posted in a group or supergroup.
    #[serde(default)]
    pub is_group: bool,
}

/// An inbound event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Update {
    /// A text message.
    Message(IncomingMessage),
    /// A callback query.
    CallbackQuery(CallbackQuery),
}

impl Update {
    /// The user that produced the update.
    pub fn from(&self) -> &UserProfile {
        match self {
            Self::Message(m) => &m.from,
            Self::CallbackQuery(q) => &q.from,
        }
    }

    /// Id of the user that produced the update.
    pub fn user_id(&self) -> UserId {
        self.from().id
    }

    /// Chat the update belongs to.
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Message(m) => m.chat_id,
            Self::CallbackQuery(q) => q.chat_id,
        }
    }

    /// Message text, if the update is a message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(m.text.as_str()),
            Self::CallbackQuery(_) => None,
        }
    }

    /// The callback query, if the update is one.
    pub fn callback(&self) -> Option<&CallbackQuery> {
        match self {
            Self::CallbackQuery(q) => Some(q),
            Self::Message(_) => None,
        }
    }

    /// Whether the update comes from a group chat.
    pub fn is_group(&self) -> bool {
        match self {
            Self::Message(m) => m.is_group,
            Self::CallbackQuery(q) => q.is_group,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::CallbackQuery(_) => "callback",
        }
    }

    /// Build a private-chat text message update (chat id = user id).
    pub fn text_from(from: UserProfile, message_id: MessageId, text: impl Into<String>) -> Self {
        Self::Message(IncomingMessage {
            message_id,
            chat_id: from.id,
            from,
            text: text.into(),
            is_group: false,
        })
    }

    /// Build a private-chat callback query update (chat id = user id).
    pub fn callback_from(
        from: UserProfile,
        id: impl Into<String>,
        message_id: MessageId,
        data: impl Into<String>,
    ) -> Self {
        Self::CallbackQuery(CallbackQuery {
            id: id.into(),
            chat_id: from.id,
            from,
            message_id,
            data: data.into(),
            is_group: false,
        })
    }
}
