//! Command handler context and the handler trait.

use crate::error::HandlerResult;
use crate::manager::Manager;
use crate::state::User;
use async_trait::async_trait;
use lexparty_proto::{ChatId, ReplyKeyboard, Sendable, Update};
use std::sync::Arc;
use tracing::warn;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Shared daemon state.
    pub manager: &'a Arc<Manager>,
    /// The user behind the update, already resolved and not banned.
    pub user: &'a User,
    /// The update being handled.
    pub update: &'a Update,
    /// Chat replies go to.
    pub chat_id: ChatId,
}

impl<'a> Context<'a> {
    pub fn new(manager: &'a Arc<Manager>, user: &'a User, update: &'a Update) -> Self {
        Self {
            manager,
            user,
            update,
            chat_id: update.chat_id(),
        }
    }

    /// Reply in the originating chat. Failures are logged, not returned.
    pub async fn reply(&self, text: impl Into<String>) {
        self.deliver(Sendable::text(self.chat_id, text)).await;
    }

    /// Reply and replace the menu keyboard.
    pub async fn reply_with_menu(&self, text: impl Into<String>, menu: ReplyKeyboard) {
        self.deliver(Sendable::text(self.chat_id, text).with_menu(menu))
            .await;
    }

    /// Route the user's next plain text to `command`'s [`Handler::resume`].
    pub fn await_reply(&self, command: &'static str) {
        self.manager.set_pending(self.user.id, command);
    }

    pub fn require_admin(&self) -> HandlerResult {
        if self.user.admin {
            Ok(())
        } else {
            Err(crate::error::HandlerError::NotAdmin)
        }
    }

    async fn deliver(&self, msg: Sendable) {
        if let Err(e) = self.manager.transport().send(msg).await {
            crate::metrics::record_send_failure();
            warn!(chat_id = self.chat_id, error = %e, "Reply failed");
        }
    }
}

/// A command or menu button.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Run the command.
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult;

    /// Consume the text the command asked for with
    /// [`Context::await_reply`].
    async fn resume(&self, _ctx: &mut Context<'_>, _text: &str) -> HandlerResult {
        Ok(())
    }

    /// Whether text after the slash command (`/ban @anna`) stands in for the
    /// awaited reply.
    fn takes_argument(&self) -> bool {
        false
    }
}
