//! Persistent user record.

use chrono::{DateTime, Utc};
use lexparty_proto::{UserId, UserProfile};
use serde::{Deserialize, Serialize};

/// Account status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Banned,
}

/// A user known to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub admin: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    /// Matches finished as a favorite.
    #[serde(default)]
    pub stars: u64,
    /// Bonus tasks experienced across all matches.
    #[serde(default)]
    pub bonus_count: u64,
}

impl User {
    /// Create a record for a first-time user. `admin_username` is compared
    /// case-insensitively, with or without a leading `@`.
    pub fn from_profile(profile: &UserProfile, admin_username: &str) -> Self {
        let admin = profile
            .username
            .as_deref()
            .is_some_and(|u| same_username(u, admin_username));
        Self {
            id: profile.id,
            admin,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            language: profile.language_code.clone(),
            username: profile.username.clone(),
            status: UserStatus::Active,
            created_at: Utc::now(),
            stars: 0,
            bonus_count: 0,
        }
    }

    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }

    pub fn display_name(&self) -> String {
        match (&self.last_name, self.first_name.is_empty()) {
            (Some(last), false) => format!("{} {}", self.first_name, last),
            (None, false) => self.first_name.clone(),
            (_, true) => self
                .username
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }

    /// Private chats share the user id.
    pub fn chat_id(&self) -> i64 {
        self.id
    }
}

/// Compare usernames ignoring case and a leading `@`.
pub fn same_username(a: &str, b: &str) -> bool {
    a.trim_start_matches('@')
        .eq_ignore_ascii_case(b.trim().trim_start_matches('@'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_follows_configured_username() {
        let profile = UserProfile::new(1, "Anna").with_username("Owner");
        assert!(User::from_profile(&profile, "@owner").admin);
        assert!(!User::from_profile(&profile, "someone").admin);
        let anonymous = UserProfile::new(2, "Bob");
        assert!(!User::from_profile(&anonymous, "owner").admin);
    }

    #[test]
    fn new_users_are_active() {
        let user = User::from_profile(&UserProfile::new(3, "Eve"), "owner");
        assert!(!user.is_banned());
        assert_eq!(user.stars, 0);
        assert_eq!(user.display_name(), "Eve");
        assert_eq!(user.chat_id(), 3);
    }
}
