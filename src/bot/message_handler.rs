//! Plain text messages: album titles while an album is open, a hint otherwise

use teloxide::types::MessageId;

use super::callbacks::album_callbacks::summary_text;
use super::ui_builder::{create_confirmation_keyboard, create_main_menu_keyboard};
use super::HandlerContext;
use crate::errors::{error_logging, AppResult};
use crate::session::SessionState;
use crate::validation::{validate_album_title, MAX_TITLE_CHARS};

pub async fn handle_idle_text(hc: &HandlerContext<'_>) -> AppResult<()> {
    hc.send(&hc.t("idle-text"), Some(create_main_menu_keyboard(hc)))
        .await?;
    Ok(())
}

/// Use the text as the title of the album in progress
pub async fn handle_title_text(
    hc: &HandlerContext<'_>,
    state: SessionState,
    text: &str,
) -> AppResult<()> {
    let title = match validate_album_title(text) {
        Ok(title) => title,
        Err(reason) => {
            error_logging::log_validation_error(&reason, "album_title", Some(hc.chat_id.0), Some(text));
            let max = MAX_TITLE_CHARS.to_string();
            hc.send(&hc.t_args("title-invalid", &[("max", &max)]), None)
                .await?;
            return Ok(());
        }
    };

    match state {
        SessionState::AwaitingPhotos {
            photos,
            last_media_group,
            ..
        } => {
            hc.ctx
                .sessions
                .update(
                    hc.chat_id,
                    SessionState::AwaitingPhotos {
                        photos,
                        title: Some(title.clone()),
                        last_media_group,
                    },
                )
                .await?;
        }
        SessionState::AwaitingConfirmation {
            photos, message_id, ..
        } => {
            let summary = summary_text(hc, &title, photos.len());
            hc.ctx
                .sessions
                .update(
                    hc.chat_id,
                    SessionState::AwaitingConfirmation {
                        photos,
                        title: Some(title.clone()),
                        message_id,
                    },
                )
                .await?;
            // Keep the summary above the buttons in sync
            if let Some(id) = message_id {
                hc.ctx
                    .api
                    .edit_text(
                        hc.chat_id,
                        MessageId(id),
                        &summary,
                        Some(create_confirmation_keyboard(hc)),
                    )
                    .await?;
            }
        }
        SessionState::Idle => return handle_idle_text(hc).await,
    }

    hc.send(&hc.t_args("title-set", &[("title", &title)]), None)
        .await?;
    Ok(())
}
