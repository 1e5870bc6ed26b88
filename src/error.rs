//! Unified error handling for lexpartyd.
//!
//! This module provides the error hierarchy for update handling, with
//! automatic conversions, user-visible replies and metric labeling.

use crate::db::DbError;
use lexparty_proto::ProtoError;
use thiserror::Error;

// ============================================================================
// Transport Errors (outbound delivery, polling)
// ============================================================================

/// Errors talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The user blocked the bot or the chat no longer exists.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("transport closed")]
    Closed,
}

impl TransportError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

impl From<ProtoError> for TransportError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Api { code: 403, description } => Self::Forbidden(description),
            ProtoError::Api { code, description } => Self::Api { code, description },
            other => Self::Decode(other.to_string()),
        }
    }
}

// ============================================================================
// Handler Errors (update processing)
// ============================================================================

/// Errors that can occur while handling an update.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough categories selected")]
    NotEnoughCategories,

    #[error("no letters selected")]
    NoLetters,

    #[error("malformed room code: {0:?}")]
    BadCode(String),

    #[error("unknown room code: {0}")]
    UnknownCode(u32),

    #[error("unknown username: {0}")]
    UnknownUsername(String),

    #[error("user is already in a session")]
    AlreadyBusy,

    #[error("user is not in a game")]
    NotInGame,

    #[error("admin command from a non-admin")]
    NotAdmin,

    #[error("match {0} is not joinable")]
    MatchNotJoinable(u32),

    #[error("only the host can do this")]
    NotHost,

    #[error("match has no players")]
    NoPlayers,

    #[error("match already started")]
    AlreadyStarted,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("storage error: {0}")]
    Db(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotEnoughCategories => "not_enough_categories",
            Self::NoLetters => "no_letters",
            Self::BadCode(_) => "bad_code",
            Self::UnknownCode(_) => "unknown_code",
            Self::UnknownUsername(_) => "unknown_username",
            Self::AlreadyBusy => "already_busy",
            Self::NotInGame => "not_in_game",
            Self::NotAdmin => "not_admin",
            Self::MatchNotJoinable(_) => "match_not_joinable",
            Self::NotHost => "not_host",
            Self::NoPlayers => "no_players",
            Self::AlreadyStarted => "already_started",
            Self::Transport(_) => "transport_error",
            Self::Db(_) => "db_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Text shown to the user.
    ///
    /// Returns `None` for errors that don't warrant a user-visible reply
    /// (transport, storage and internal failures).
    pub fn user_reply(&self) -> Option<String> {
        let text = match self {
            Self::NotEnoughCategories => "Выберите хотя бы 3 категории.".to_string(),
            Self::NoLetters => "Оставьте хотя бы одну букву.".to_string(),
            Self::BadCode(_) => "Код комнаты должен быть числом. Попробуйте ещё раз.".to_string(),
            Self::UnknownCode(code) => format!("Комнаты с кодом {code} не существует."),
            Self::UnknownUsername(name) => format!("Пользователь {name} не найден."),
            Self::AlreadyBusy => {
                "Вы уже создаёте игру или участвуете в ней. Сначала покиньте её.".to_string()
            }
            Self::NotInGame => "Вы не участвуете в игре.".to_string(),
            Self::NotAdmin => "Эта команда доступна только администратору.".to_string(),
            Self::MatchNotJoinable(code) => format!("Игра #{code} уже закончилась."),
            Self::NotHost => "Это может сделать только ведущий.".to_string(),
            Self::NoPlayers => "Нужен хотя бы один игрок.".to_string(),
            Self::AlreadyStarted => "Игра уже идёт.".to_string(),

            // These errors don't get user-visible replies
            Self::Transport(_) => return None,
            Self::Db(_) => return None,
            Self::Internal(_) => return None,
        };
        Some(text)
    }
}

/// Result type for update handlers.
pub type HandlerResult = Result<(), HandlerError>;
