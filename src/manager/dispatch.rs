//! Inbound update routing.
//!
//! Order of precedence for one update:
//! 1. callback queries are acknowledged
//! 2. group chats get a refusal
//! 3. the author is resolved; banned users get a refusal
//! 4. registered commands and menu buttons, then replies awaited by a command
//! 5. the author's building session
//! 6. the author's match
//! 7. a hint for unrecognized text

use super::Manager;
use crate::error::HandlerResult;
use crate::handlers::{Context, Registry};
use crate::metrics;
use crate::telemetry::spans;
use crate::ui;
use lexparty_proto::{Sendable, Update};
use std::sync::Arc;
use tracing::{Instrument, debug, warn};

impl Manager {
    /// Handle one inbound update. Errors are answered or logged here.
    pub async fn dispatch(self: &Arc<Self>, update: Update) {
        metrics::record_update(update.kind());
        let span = spans::update(update.user_id(), update.kind());
        async {
            if let Err(e) = self.route(&update).await {
                metrics::record_handler_error(e.error_code());
                match e.user_reply() {
                    Some(text) => self.notify(Sendable::text(update.chat_id(), text)).await,
                    None => warn!(error = %e, "Update failed"),
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn route(self: &Arc<Self>, update: &Update) -> HandlerResult {
        if let Some(query) = update.callback() {
            self.notify(Sendable::answer(query.id.clone())).await;
        }
        if update.is_group() {
            self.notify(Sendable::text(update.chat_id(), ui::GROUP_CHAT))
                .await;
            return Ok(());
        }

        let user = self
            .db
            .users()
            .resolve(update.from(), &self.admin_username)?;
        if user.is_banned() {
            debug!("Update from banned user dropped");
            self.notify(Sendable::text(update.chat_id(), ui::BANNED))
                .await;
            return Ok(());
        }

        if let Some(text) = update.text() {
            if let Some(command) = self.registry.lookup(text) {
                self.pending.remove(&user.id);
                let mut ctx = Context::new(self, &user, update);
                return self
                    .registry
                    .dispatch(command, &mut ctx, Registry::argument(text))
                    .await;
            }
            if let Some((_, command)) = self.pending.remove(&user.id) {
                let mut ctx = Context::new(self, &user, update);
                return self.registry.resume(command, &mut ctx, text).await;
            }
        }

        if let Some(builder) = self.building_of(user.id) {
            return builder.execute(update).await;
        }

        if let Some(session) = self.match_of(user.id) {
            if !session.execute(user.id, update).await? {
                debug!(code = session.code(), "Text ignored by match");
            }
            return Ok(());
        }

        if update.text().is_some() {
            self.notify(Sendable::text(update.chat_id(), ui::HINT).with_menu(ui::main_menu()))
                .await;
        }
        Ok(())
    }

    async fn notify(&self, msg: Sendable) {
        if let Err(e) = self.deps.transport.send(msg).await {
            metrics::record_send_failure();
            warn!(error = %e, "Notification failed");
        }
    }
}
