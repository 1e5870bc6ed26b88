//! Telegram Bot API transport.
//!
//! Outbound sends share one governor token bucket so bursts from many rooms
//! stay under the platform's global limit. Inbound updates arrive either via
//! the long-polling loop in [`TelegramTransport::run_polling`] or via the
//! webhook route in `http.rs`; both feed the same channel.

use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lexparty_proto::telegram::{SentMessage, get_updates_params, parse_response, parse_updates};
use lexparty_proto::{MessageId, Sendable, Update, UserProfile};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://api.telegram.org";

/// Global outbound quota.
const SENDS_PER_SECOND: u32 = 25;

/// Pause after a failed poll.
const POLL_BACKOFF: Duration = Duration::from_secs(3);

/// Bot API client.
pub struct TelegramTransport {
    client: reqwest::Client,
    base: String,
    limiter: DefaultDirectRateLimiter,
}

impl TelegramTransport {
    /// Create a client for `token`. The HTTP timeout leaves room for a full
    /// long-poll cycle.
    pub fn new(token: &str, poll_timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 15))
            .build()?;
        let rate = NonZeroU32::new(SENDS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            client,
            base: format!("{API_BASE}/bot{token}"),
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Call a Bot API method and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let url = format!("{}/{}", self.base, method);
        let resp = self.client.post(&url).json(body).send().await?;
        let bytes = resp.bytes().await?;
        Ok(parse_response(&bytes)?)
    }

    /// Identify the bot. Fails when the token is rejected.
    pub async fn get_me(&self) -> Result<UserProfile, TransportError> {
        self.call("getMe", &json!({})).await
    }

    /// Register the public webhook URL.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "setWebhook",
                &json!({ "url": url, "allowed_updates": ["message", "callback_query"] }),
            )
            .await?;
        info!("Webhook registered");
        Ok(())
    }

    /// Remove any registered webhook so `getUpdates` works.
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    /// One `getUpdates` round trip.
    pub async fn poll(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<(Option<i64>, Vec<Update>), TransportError> {
        let url = format!("{}/getUpdates", self.base);
        let resp = self
            .client
            .post(&url)
            .json(&get_updates_params(offset, timeout_secs))
            .send()
            .await?;
        let bytes = resp.bytes().await?;
        Ok(parse_updates(&bytes)?)
    }

    /// Long-poll until `cancel` fires or the receiver goes away.
    pub async fn run_polling(
        self: Arc<Self>,
        tx: mpsc::Sender<Update>,
        cancel: CancellationToken,
        timeout_secs: u64,
    ) {
        info!(timeout_secs, "Long polling started");
        let mut offset: Option<i64> = None;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.poll(offset, timeout_secs) => r,
            };
            match result {
                Ok((last, updates)) => {
                    if let Some(last) = last {
                        offset = Some(last + 1);
                    }
                    debug!(count = updates.len(), "Polled updates");
                    for update in updates {
                        if tx.send(update).await.is_err() {
                            info!("Update channel closed, polling stopped");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
            }
        }
        info!("Long polling stopped");
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, msg: Sendable) -> Result<Option<MessageId>, TransportError> {
        self.limiter.until_ready().await;
        let method = msg.method();
        let payload = msg.payload();
        match msg {
            Sendable::Text { .. } | Sendable::Sticker { .. } => {
                let sent: SentMessage = self.call(method, &payload).await?;
                Ok(Some(sent.message_id))
            }
            _ => {
                let _: Value = self.call(method, &payload).await?;
                Ok(None)
            }
        }
    }
}
