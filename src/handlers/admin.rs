//! Administrator commands.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::UserStatus;
use crate::ui;
use async_trait::async_trait;
use tracing::info;

/// `/add`: appends a category to the builder defaults.
pub struct AddCategoryHandler;

#[async_trait]
impl Handler for AddCategoryHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.require_admin()?;
        ctx.await_reply("/add");
        ctx.reply(ui::ASK_CATEGORY).await;
        Ok(())
    }

    async fn resume(&self, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        ctx.require_admin()?;
        let name = text.trim();
        if ctx.manager.add_category(name) {
            info!(user_id = ctx.user.id, category = %name, "Default category added");
        }
        ctx.reply(ui::category_added(name)).await;
        Ok(())
    }

    fn takes_argument(&self) -> bool {
        true
    }
}

/// `/ban`: bans a user by username.
pub struct BanHandler;

#[async_trait]
impl Handler for BanHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.require_admin()?;
        ctx.await_reply("/ban");
        ctx.reply(ui::ASK_USERNAME).await;
        Ok(())
    }

    async fn resume(&self, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        ctx.require_admin()?;
        let username = text.trim();
        let users = ctx.manager.db().users();
        let target = users
            .fetch_by_username(username)?
            .ok_or_else(|| HandlerError::UnknownUsername(username.to_string()))?;
        users.set_status(target.id, UserStatus::Banned)?;
        if ctx.manager.leave(&target).await.is_ok() {
            info!(user_id = target.id, "Banned user removed from their session");
        }
        info!(admin_id = ctx.user.id, user_id = target.id, "User banned");
        ctx.reply(ui::banned(&target.display_name())).await;
        Ok(())
    }

    fn takes_argument(&self) -> bool {
        true
    }
}
