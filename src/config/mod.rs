//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BotConfig, TimeoutsConfig)
//! - [`game`]: Builder defaults and the bonus catalog (GameConfig)
//! - [`validation`]: Startup checks collecting every error found

mod game;
mod types;
mod validation;

pub use game::GameConfig;
pub use types::{
    BotConfig, CacheConfig, Config, ConfigError, DatabaseConfig, ServerConfig, TimeoutsConfig,
    WebhookConfig,
};
pub use validation::{ValidationError, validate};
