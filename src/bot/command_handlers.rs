//! Command Handlers module for processing bot commands

use tracing::debug;

use super::ui_builder::create_main_menu_keyboard;
use super::HandlerContext;
use crate::errors::AppResult;
use crate::session::SessionState;

/// Handle the /start command
pub async fn handle_start_command(hc: &HandlerContext<'_>) -> AppResult<()> {
    let user = hc
        .ctx
        .store
        .upsert_user(hc.user_id, hc.language_code)
        .await?;
    debug!(user_id = %user.id, telegram_id = %user.telegram_id, "User started the bot");

    let text = hc.t_args("welcome", &[("name", hc.first_name)]);
    hc.send(&text, Some(create_main_menu_keyboard(hc))).await?;
    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(hc: &HandlerContext<'_>) -> AppResult<()> {
    hc.send(&hc.t("help"), Some(create_main_menu_keyboard(hc)))
        .await?;
    Ok(())
}

/// Handle /cancel and the Cancel button
pub async fn handle_cancel_command(hc: &HandlerContext<'_>, state: SessionState) -> AppResult<()> {
    if state.is_idle() {
        hc.send(&hc.t("nothing-to-cancel"), None).await?;
        return Ok(());
    }

    hc.ctx.sessions.reset(hc.chat_id).await?;
    debug!(chat_id = %hc.chat_id, from = state.label(), "Album discarded");

    if let SessionState::AwaitingConfirmation { message_id, .. } = state {
        hc.remove_keyboard(message_id).await;
    }

    hc.send(&hc.t("album-cancelled"), Some(create_main_menu_keyboard(hc)))
        .await?;
    Ok(())
}

pub async fn handle_unknown_command(hc: &HandlerContext<'_>, name: &str) -> AppResult<()> {
    debug!(chat_id = %hc.chat_id, command = %name, "Unknown command");
    hc.send(&hc.t_args("unknown-command", &[("command", name)]), None)
        .await?;
    Ok(())
}
