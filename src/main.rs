//! lexpartyd - chat-bot server for a party word game
//!
//! Players build a match through an inline-keyboard wizard, share a short
//! room code and take turns naming words for a random letter against a
//! timer. Every session is an independent tokio task owned by the manager.

mod config;
mod db;
mod error;
mod game;
mod handlers;
mod http;
mod manager;
mod metrics;
mod network;
mod state;
mod telemetry;
mod ui;

use crate::config::Config;
use crate::db::Database;
use crate::manager::{Manager, ManagerDeps};
use crate::network::TelegramTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the inbound update channel.
const UPDATE_CHANNEL_SIZE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load config {config_path}: {e}"))?;

    // Initialize tracing
    let default_level = if config.server.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "refusing to start with {} configuration error(s)",
            errors.len()
        ));
    }
    info!(path = %config_path, "Starting lexpartyd");

    metrics::init();

    // Initialize database
    let db = Arc::new(Database::open(&config.database.path, config.cache.size)?);
    info!(path = %config.database.path, "Database opened");

    // Bot API client
    let transport = Arc::new(TelegramTransport::new(
        &config.bot.token,
        config.bot.poll_timeout_secs,
    )?);
    let me = transport.get_me().await?;
    info!(bot_id = me.id, username = ?me.username, "Bot authenticated");

    let manager = Manager::new(&config, db, ManagerDeps::new(transport.clone()));
    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_SIZE);

    // Update delivery: webhook when configured, long polling otherwise
    match &config.bot.webhook {
        Some(hook) => {
            let addr: SocketAddr = hook.address.parse()?;
            transport
                .set_webhook(&http::webhook_url(&hook.public_url, &config.bot.token))
                .await?;
            tokio::spawn(http::serve(
                "webhook",
                addr,
                http::webhook_router(tx, &config.bot.token),
                shutdown.clone(),
            ));
        }
        None => {
            transport.delete_webhook().await?;
            tokio::spawn(Arc::clone(&transport).run_polling(
                tx,
                shutdown.clone(),
                config.bot.poll_timeout_secs,
            ));
        }
    }

    // Convention: health_port = 0 disables the health endpoint.
    if config.server.health_port == 0 {
        info!("Health endpoint disabled");
    } else {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.health_port));
        tokio::spawn(http::serve(
            "health",
            addr,
            http::health_router(Arc::clone(&manager)),
            shutdown.clone(),
        ));
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, shutting down"),
                Err(e) => warn!(error = %e, "Signal handler failed, shutting down"),
            }
            shutdown.cancel();
        });
    }

    manager.run(rx, shutdown).await;
    info!("lexpartyd stopped");
    Ok(())
}
