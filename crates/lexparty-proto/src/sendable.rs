//! Outbound items.

use crate::keyboard::{InlineKeyboard, Markup, ReplyKeyboard};
use crate::types::{ChatId, MessageId};
use serde::{Deserialize, Serialize};

/// Anything the daemon can ask the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sendable {
    /// A new text message, optionally with markup.
    Text {
        /// Target chat.
        chat_id: ChatId,
        /// Message text.
        text: String,
        /// Optional keyboard.
        markup: Option<Markup>,
    },
    /// Replace the text (and optionally the keyboard) of a sent message.
    EditText {
        /// Target chat.
        chat_id: ChatId,
        /// Message to edit.
        message_id: MessageId,
        /// New text.
        text: String,
        /// New inline keyboard; `None` removes it.
        keyboard: Option<InlineKeyboard>,
    },
    /// Replace only the inline keyboard of a sent message.
    EditKeyboard {
        /// Target chat.
        chat_id: ChatId,
        /// Message to edit.
        message_id: MessageId,
        /// New keyboard.
        keyboard: InlineKeyboard,
    },
    /// Delete a sent message.
    Delete {
        /// Target chat.
        chat_id: ChatId,
        /// Message to delete.
        message_id: MessageId,
    },
    /// A sticker by file id.
    Sticker {
        /// Target chat.
        chat_id: ChatId,
        /// Sticker file id.
        file_id: String,
    },
    /// Acknowledge a callback query.
    AnswerCallback {
        /// Query id.
        callback_id: String,
        /// Optional toast text.
        text: Option<String>,
    },
}

impl Sendable {
    /// A plain text message.
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::Text {
            chat_id,
            text: text.into(),
            markup: None,
        }
    }

    /// Attach an inline keyboard to a text message. No-op for other variants.
    pub fn with_inline(self, keyboard: InlineKeyboard) -> Self {
        self.with_markup(Markup::Inline(keyboard))
    }

    /// Attach a menu keyboard to a text message. No-op for other variants.
    pub fn with_menu(self, menu: ReplyKeyboard) -> Self {
        self.with_markup(Markup::Reply(menu))
    }

    fn with_markup(self, new_markup: Markup) -> Self {
        match self {
            Self::Text { chat_id, text, .. } => Self::Text {
                chat_id,
                text,
                markup: Some(new_markup),
            },
            other => other,
        }
    }

    /// Edit the text of a message, dropping its keyboard.
    pub fn edit_text(chat_id: ChatId, message_id: MessageId, text: impl Into<String>) -> Self {
        Self::EditText {
            chat_id,
            message_id,
            text: text.into(),
            keyboard: None,
        }
    }

    /// Edit the text of a message and set a new keyboard.
    pub fn edit_text_with(
        chat_id: ChatId,
        message_id: MessageId,
        text: impl Into<String>,
        keyboard: InlineKeyboard,
    ) -> Self {
        Self::EditText {
            chat_id,
            message_id,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Replace the keyboard of a message.
    pub fn edit_keyboard(chat_id: ChatId, message_id: MessageId, keyboard: InlineKeyboard) -> Self {
        Self::EditKeyboard {
            chat_id,
            message_id,
            keyboard,
        }
    }

    /// Delete a message.
    pub fn delete(chat_id: ChatId, message_id: MessageId) -> Self {
        Self::Delete {
            chat_id,
            message_id,
        }
    }

    /// Send a sticker.
    pub fn sticker(chat_id: ChatId, file_id: impl Into<String>) -> Self {
        Self::Sticker {
            chat_id,
            file_id: file_id.into(),
        }
    }

    /// Acknowledge a callback query without a toast.
    pub fn answer(callback_id: impl Into<String>) -> Self {
        Self::AnswerCallback {
            callback_id: callback_id.into(),
            text: None,
        }
    }

    /// Target chat, when the item is addressed to one.
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Self::Text { chat_id, .. }
            | Self::EditText { chat_id, .. }
            | Self::EditKeyboard { chat_id, .. }
            | Self::Delete { chat_id, .. }
            | Self::Sticker { chat_id, .. } => Some(*chat_id),
            Self::AnswerCallback { .. } => None,
        }
    }

    /// Text carried by the item, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } | Self::EditText { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Inline keyboard carried by the item, if any.
    pub fn inline_keyboard(&self) -> Option<&InlineKeyboard> {
        match self {
            Self::Text {
                markup: Some(Markup::Inline(kb)),
                ..
            } => Some(kb),
            Self::EditText {
                keyboard: Some(kb), ..
            } => Some(kb),
            Self::EditKeyboard { keyboard, .. } => Some(keyboard),
            _ => None,
        }
    }

    /// Bot API method name for this item.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Text { .. } => "sendMessage",
            Self::EditText { .. } => "editMessageText",
            Self::EditKeyboard { .. } => "editMessageReplyMarkup",
            Self::Delete { .. } => "deleteMessage",
            Self::Sticker { .. } => "sendSticker",
            Self::AnswerCallback { .. } => "answerCallbackQuery",
        }
    }
}
