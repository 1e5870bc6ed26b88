//! Error types for wire decoding.

use thiserror::Error;

/// Errors produced while decoding transport payloads.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The payload was not valid JSON for the expected shape.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with `ok = false`.
    #[error("api error {code}: {description}")]
    Api {
        /// Numeric error code reported by the API (HTTP-like).
        code: i64,
        /// Human readable description.
        description: String,
    },

    /// The API answered `ok = true` without a result.
    #[error("api response has no result")]
    MissingResult,

    /// Callback data did not follow the `tag[:arg]` form.
    #[error("invalid callback data: {0:?}")]
    InvalidCallback(String),
}

impl ProtoError {
    /// Whether the API refused delivery because the user blocked the bot
    /// or the chat no longer exists.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Api { code: 403, .. })
    }
}
