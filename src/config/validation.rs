//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.token is required")]
    MissingToken,
    #[error("bot.admin_username is required")]
    MissingAdmin,
    #[error("bot.webhook.public_url must be an https URL, got '{0}'")]
    InvalidWebhookUrl(String),
    #[error("cache.size must be at least 1")]
    EmptyCache,
    #[error("timeouts.ready_warning_secs ({warning}) must be below timeouts.ready_fatal_secs ({fatal})")]
    ReadyTimeoutOrder { warning: u64, fatal: u64 },
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("game.alphabet must contain at least one letter")]
    EmptyAlphabet,
    #[error("game.categories must list at least 3 categories, got {0}")]
    NotEnoughCategories(usize),
    #[error("game.bonus '{0}' must have a positive weight")]
    InvalidBonusWeight(String),
    #[error("game.bonus '{0}' is listed more than once")]
    DuplicateBonus(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.bot.token.trim().is_empty() {
        errors.push(ValidationError::MissingToken);
    }
    if config.bot.admin_username.trim().is_empty() {
        errors.push(ValidationError::MissingAdmin);
    }
    if let Some(ref hook) = config.bot.webhook
        && !hook.public_url.starts_with("https://")
    {
        errors.push(ValidationError::InvalidWebhookUrl(hook.public_url.clone()));
    }

    if config.cache.size == 0 {
        errors.push(ValidationError::EmptyCache);
    }

    let t = &config.timeouts;
    if t.ready_warning_secs >= t.ready_fatal_secs {
        errors.push(ValidationError::ReadyTimeoutOrder {
            warning: t.ready_warning_secs,
            fatal: t.ready_fatal_secs,
        });
    }
    for (name, value) in [
        ("building_secs", t.building_secs),
        ("match_secs", t.match_secs),
        ("vote_secs", t.vote_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let game = &config.game;
    if game.letters().is_empty() {
        errors.push(ValidationError::EmptyAlphabet);
    }
    if game.categories.len() < 3 {
        errors.push(ValidationError::NotEnoughCategories(game.categories.len()));
    }
    // A drawn bonus leaves the catalog by name.
    let mut seen = HashSet::new();
    for bonus in &game.bonus {
        if bonus.weight.is_nan() || bonus.weight <= 0.0 {
            errors.push(ValidationError::InvalidBonusWeight(bonus.name.clone()));
        }
        if !seen.insert(bonus.name.as_str()) {
            errors.push(ValidationError::DuplicateBonus(bonus.name.clone()));
        }
    }

    // Database path validation
    if let Some(parent) = Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(
            parent.display().to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
