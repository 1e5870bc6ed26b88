//! Identifier aliases and the user profile carried by every update.

use serde::{Deserialize, Serialize};

/// Chat identifier.
pub type ChatId = i64;

/// Stable numeric user identifier.
pub type UserId = i64;

/// Identifier of a message inside a chat.
pub type MessageId = i64;

/// Profile of the user that produced an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: UserId,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name (always present on Telegram).
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl UserProfile {
    /// Create a profile with an id and a first name.
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            ..Default::default()
        }
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Display name: first and last name joined, falling back to the username.
    pub fn display_name(&self) -> String {
        match (&self.last_name, self.first_name.is_empty()) {
            (Some(last), false) => format!("{} {}", self.first_name, last),
            (None, false) => self.first_name.clone(),
            (Some(last), true) => last.clone(),
            (None, true) => self
                .username
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }
}
