//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::game::GameConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot credentials and update delivery.
    pub bot: BotConfig,
    /// Process-level switches and the health endpoint.
    #[serde(default)]
    pub server: ServerConfig,
    /// User cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session and round timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Builder defaults and the bonus catalog.
    #[serde(default)]
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Bot credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot API token.
    pub token: String,
    /// Username (without `@`) of the administrator account.
    pub admin_username: String,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Webhook delivery. When absent the daemon long-polls.
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Local address the webhook listener binds to.
    pub address: String,
    /// Public HTTPS URL registered with the Bot API.
    pub public_url: String,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Verbose logging when `RUST_LOG` is not set.
    #[serde(default)]
    pub debug: bool,
    /// Port for `/health` and `/metrics` (0 disables).
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            health_port: default_health_port(),
        }
    }
}

/// Cache sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached users.
    #[serde(default = "default_cache_size")]
    pub size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: default_cache_size(),
        }
    }
}

/// Session timeouts, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// Lifetime of an unconfirmed building session.
    #[serde(default = "default_building_secs")]
    pub building_secs: u64,
    /// Lifetime of a match.
    #[serde(default = "default_match_secs")]
    pub match_secs: u64,
    /// Idle time before the active player is nagged to press ready.
    #[serde(default = "default_ready_warning_secs")]
    pub ready_warning_secs: u64,
    /// Idle time before the active player is skipped.
    #[serde(default = "default_ready_fatal_secs")]
    pub ready_fatal_secs: u64,
    /// How long a vote stays open.
    #[serde(default = "default_vote_secs")]
    pub vote_secs: u64,
}

impl TimeoutsConfig {
    pub fn building(&self) -> Duration {
        Duration::from_secs(self.building_secs)
    }

    pub fn matches(&self) -> Duration {
        Duration::from_secs(self.match_secs)
    }

    pub fn ready_warning(&self) -> Duration {
        Duration::from_secs(self.ready_warning_secs)
    }

    pub fn ready_fatal(&self) -> Duration {
        Duration::from_secs(self.ready_fatal_secs)
    }

    pub fn vote(&self) -> Duration {
        Duration::from_secs(self.vote_secs)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            building_secs: default_building_secs(),
            match_secs: default_match_secs(),
            ready_warning_secs: default_ready_warning_secs(),
            ready_fatal_secs: default_ready_fatal_secs(),
            vote_secs: default_vote_secs(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the redb file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_poll_timeout() -> u64 {
    60
}

fn default_health_port() -> u16 {
    8080
}

fn default_cache_size() -> usize {
    1024
}

fn default_building_secs() -> u64 {
    60 * 60
}

fn default_match_secs() -> u64 {
    24 * 60 * 60
}

fn default_ready_warning_secs() -> u64 {
    500
}

fn default_ready_fatal_secs() -> u64 {
    600
}

fn default_vote_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    "lexparty.redb".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[bot]
token = "123:abc"
admin_username = "owner"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.bot.poll_timeout_secs, 60);
        assert!(config.bot.webhook.is_none());
        assert_eq!(config.server.health_port, 8080);
        assert!(!config.server.debug);
        assert_eq!(config.cache.size, 1024);
        assert_eq!(config.database.path, "lexparty.redb");
    }

    #[test]
    fn timeouts_default_to_documented_values() {
        let t = TimeoutsConfig::default();
        assert_eq!(t.building(), Duration::from_secs(3600));
        assert_eq!(t.matches(), Duration::from_secs(86400));
        assert_eq!(t.ready_warning(), Duration::from_secs(500));
        assert_eq!(t.ready_fatal(), Duration::from_secs(600));
        assert_eq!(t.vote(), Duration::from_secs(30));
    }

    #[test]
    fn webhook_section_is_parsed() {
        let toml = r#"
[bot]
token = "t"
admin_username = "a"
[bot.webhook]
address = "0.0.0.0:8443"
public_url = "https://example.org/hook"
"#;
        let config = Config::parse(toml).unwrap();
        let hook = config.bot.webhook.unwrap();
        assert_eq!(hook.address, "0.0.0.0:8443");
        assert_eq!(hook.public_url, "https://example.org/hook");
    }

    #[test]
    fn missing_bot_section_is_an_error() {
        assert!(matches!(
            Config::parse("[server]\ndebug = true\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/lexparty.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
