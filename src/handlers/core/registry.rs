//! Command handler registry and dispatch.
//!
//! The `Registry` maps slash commands and menu button labels to handlers and
//! keeps per-command usage counters.

use super::context::{Context, Handler};
use crate::error::HandlerResult;
use crate::handlers::{
    admin::{AddCategoryHandler, BanHandler},
    info::{FeedbackHandler, MyProfileHandler, ProfileHandler, RulesHandler, StartHandler},
    room::{CreateHandler, ForwardHandler, JoinHandler, LeaveHandler},
};
use crate::telemetry::{CommandTimer, spans};
use crate::ui::buttons;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug};

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
    /// Usage counters, one per registered command.
    command_counts: HashMap<&'static str, AtomicU64>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Slash commands
        handlers.insert("/start", Box::new(StartHandler));
        handlers.insert("/rules", Box::new(RulesHandler));
        handlers.insert("/feedback", Box::new(FeedbackHandler));
        handlers.insert("/profile", Box::new(ProfileHandler));
        handlers.insert("/add", Box::new(AddCategoryHandler));
        handlers.insert("/ban", Box::new(BanHandler));

        // Main menu
        handlers.insert(buttons::CREATE, Box::new(CreateHandler));
        handlers.insert(buttons::JOIN, Box::new(JoinHandler));
        handlers.insert(buttons::RULES, Box::new(RulesHandler));
        handlers.insert(buttons::PROFILE, Box::new(MyProfileHandler));

        // In-game menu
        handlers.insert(buttons::LEAVE, Box::new(LeaveHandler));
        handlers.insert(buttons::START, Box::new(ForwardHandler));
        handlers.insert(buttons::RATING, Box::new(ForwardHandler));
        handlers.insert(buttons::SETTINGS, Box::new(ForwardHandler));

        let command_counts = handlers
            .keys()
            .map(|&cmd| (cmd, AtomicU64::new(0)))
            .collect();

        Self {
            handlers,
            command_counts,
        }
    }

    /// Registered command matching `text`, if any. Slash commands match on
    /// their first word with any `@botname` suffix removed; buttons match
    /// their exact label.
    pub fn lookup(&self, text: &str) -> Option<&'static str> {
        let text = text.trim();
        let key = if text.starts_with('/') {
            let word = text.split_whitespace().next().unwrap_or(text);
            word.split('@').next().unwrap_or(word).to_lowercase()
        } else {
            text.to_string()
        };
        self.handlers.get_key_value(key.as_str()).map(|(k, _)| *k)
    }

    /// Text following a slash command, if any.
    pub fn argument(text: &str) -> Option<&str> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let (_, rest) = text.split_once(char::is_whitespace)?;
        let rest = rest.trim();
        (!rest.is_empty()).then_some(rest)
    }

    /// Get command usage statistics, most used first.
    pub fn command_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (*cmd, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        stats
    }

    /// Run `command`. An inline `argument` goes straight to
    /// [`Handler::resume`] for commands that take one. Unknown names are
    /// ignored.
    pub async fn dispatch(
        &self,
        command: &'static str,
        ctx: &mut Context<'_>,
        argument: Option<&str>,
    ) -> HandlerResult {
        let Some(handler) = self.handlers.get(command) else {
            return Ok(());
        };
        if let Some(counter) = self.command_counts.get(command) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        let _timer = CommandTimer::new(command);
        let span = spans::command(command, ctx.user.id);
        let result = match argument {
            Some(text) if handler.takes_argument() => handler.resume(ctx, text).instrument(span).await,
            _ => handler.handle(ctx).instrument(span).await,
        };
        if let Err(ref e) = result {
            debug!(command, error = %e, "Command error");
        }
        result
    }

    /// Hand the awaited text to `command`.
    pub async fn resume(&self, command: &'static str, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        let Some(handler) = self.handlers.get(command) else {
            return Ok(());
        };
        let span = spans::command(command, ctx.user.id);
        handler.resume(ctx, text).instrument(span).await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_normalizes_commands() {
        let registry = Registry::new();
        assert_eq!(registry.lookup("/start"), Some("/start"));
        assert_eq!(registry.lookup("  /Rules@lexparty_bot  "), Some("/rules"));
        assert_eq!(registry.lookup("/ban @anna"), Some("/ban"));
        assert_eq!(registry.lookup(buttons::CREATE), Some(buttons::CREATE));
        assert_eq!(registry.lookup("/unknown"), None);
        assert_eq!(registry.lookup("Город"), None);
    }

    #[test]
    fn argument_follows_the_command_word() {
        assert_eq!(Registry::argument("/ban @anna"), Some("@anna"));
        assert_eq!(Registry::argument("  /profile@lexparty_bot   anna "), Some("anna"));
        assert_eq!(Registry::argument("/ban"), None);
        assert_eq!(Registry::argument("/ban   "), None);
        assert_eq!(Registry::argument(buttons::CREATE), None);
    }

    #[test]
    fn rules_button_and_command_share_handler_slots() {
        let registry = Registry::new();
        assert!(registry.lookup(buttons::RULES).is_some());
        assert!(registry.command_stats().is_empty());
    }
}
