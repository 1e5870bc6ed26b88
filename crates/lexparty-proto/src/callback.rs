//! Callback data encoding.
//!
//! Inline buttons carry a short `tag` optionally followed by `:arg`
//! (for example `opt:3`, `nav:next`, `vote:up`). Telegram limits callback
//! data to 64 bytes, which these tags stay well under.

use crate::error::ProtoError;
use std::fmt;
use std::str::FromStr;

/// Maximum callback data length accepted by Telegram.
pub const MAX_CALLBACK_LEN: usize = 64;

/// Parsed callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData {
    /// Leading tag.
    pub tag: String,
    /// Optional argument after the first `:`.
    pub arg: Option<String>,
}

impl CallbackData {
    /// Data with a tag only.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            arg: None,
        }
    }

    /// Data with a tag and an argument.
    pub fn with_arg(tag: impl Into<String>, arg: impl fmt::Display) -> Self {
        Self {
            tag: tag.into(),
            arg: Some(arg.to_string()),
        }
    }

    /// Parse the argument as a number.
    pub fn arg_as<T: FromStr>(&self) -> Option<T> {
        self.arg.as_deref().and_then(|a| a.parse().ok())
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}:{}", self.tag, arg),
            None => f.write_str(&self.tag),
        }
    }
}

impl FromStr for CallbackData {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_CALLBACK_LEN {
            return Err(ProtoError::InvalidCallback(s.to_string()));
        }
        let (tag, arg) = match s.split_once(':') {
            Some((tag, arg)) => (tag, Some(arg.to_string())),
            None => (s, None),
        };
        if tag.is_empty() {
            return Err(ProtoError::InvalidCallback(s.to_string()));
        }
        Ok(Self {
            tag: tag.to_string(),
            arg,
        })
    }
}

impl From<CallbackData> for String {
    fn from(data: CallbackData) -> Self {
        data.to_string()
    }
}
