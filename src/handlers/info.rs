//! Greeting, rules, profiles and feedback.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::User;
use crate::ui;
use async_trait::async_trait;
use lexparty_proto::Sendable;
use tracing::{info, warn};

/// `/start`: greet and show the main menu.
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.reply_with_menu(ui::GREETING, ui::main_menu()).await;
        Ok(())
    }
}

/// `/rules` and the rules button.
pub struct RulesHandler;

#[async_trait]
impl Handler for RulesHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.reply(ui::RULES).await;
        Ok(())
    }
}

/// Profile button: the caller's own statistics.
pub struct MyProfileHandler;

#[async_trait]
impl Handler for MyProfileHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        show_profile(ctx, ctx.user).await
    }
}

/// `/profile`: asks for a username, then shows that user's statistics.
pub struct ProfileHandler;

#[async_trait]
impl Handler for ProfileHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.await_reply("/profile");
        ctx.reply(ui::ASK_USERNAME).await;
        Ok(())
    }

    async fn resume(&self, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        let username = text.trim();
        let user = ctx
            .manager
            .db()
            .users()
            .fetch_by_username(username)?
            .ok_or_else(|| HandlerError::UnknownUsername(username.to_string()))?;
        show_profile(ctx, &user).await
    }

    fn takes_argument(&self) -> bool {
        true
    }
}

async fn show_profile(ctx: &Context<'_>, user: &User) -> HandlerResult {
    let stats = ctx.manager.db().stats().aggregate(user.id)?;
    ctx.reply(ui::profile(user, &stats)).await;
    Ok(())
}

/// `/feedback`: forwards the next message to the administrator.
pub struct FeedbackHandler;

#[async_trait]
impl Handler for FeedbackHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.await_reply("/feedback");
        ctx.reply(ui::ASK_FEEDBACK).await;
        Ok(())
    }

    async fn resume(&self, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        let admin = ctx
            .manager
            .db()
            .users()
            .fetch_by_username(ctx.manager.admin_username())?;
        match admin {
            Some(admin) => {
                let from = match &ctx.user.username {
                    Some(username) => format!("{} (@{username})", ctx.user.display_name()),
                    None => ctx.user.display_name(),
                };
                ctx.manager
                    .transport()
                    .send(Sendable::text(admin.chat_id(), ui::feedback_for_admin(&from, text)))
                    .await?;
                info!(user_id = ctx.user.id, "Feedback forwarded");
            }
            None => warn!(user_id = ctx.user.id, "Administrator unknown, feedback dropped"),
        }
        ctx.reply(ui::FEEDBACK_THANKS).await;
        Ok(())
    }

    fn takes_argument(&self) -> bool {
        true
    }
}
