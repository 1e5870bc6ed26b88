//! Creating, joining and leaving rooms, plus the in-game menu.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::ui;
use async_trait::async_trait;

/// Create button: opens the match builder.
pub struct CreateHandler;

#[async_trait]
impl Handler for CreateHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.manager.create_building(ctx.user).await
    }
}

/// Join button: asks for a room code, then joins that room.
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.await_reply(ui::buttons::JOIN);
        ctx.reply(ui::ASK_CODE).await;
        Ok(())
    }

    async fn resume(&self, ctx: &mut Context<'_>, text: &str) -> HandlerResult {
        let code = ctx.manager.join(ctx.user, text).await?;
        ctx.reply_with_menu(ui::joined(code), ui::player_menu()).await;
        Ok(())
    }
}

/// Leave button: leaves the builder or the current room.
pub struct LeaveHandler;

#[async_trait]
impl Handler for LeaveHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        ctx.manager.leave(ctx.user).await?;
        ctx.reply_with_menu(ui::LEFT_GAME, ui::main_menu()).await;
        Ok(())
    }
}

/// Start, rating and settings buttons, handled by the user's room.
pub struct ForwardHandler;

#[async_trait]
impl Handler for ForwardHandler {
    async fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        let session = ctx
            .manager
            .match_of(ctx.user.id)
            .ok_or(HandlerError::NotInGame)?;
        session.execute(ctx.user.id, ctx.update).await?;
        Ok(())
    }
}
