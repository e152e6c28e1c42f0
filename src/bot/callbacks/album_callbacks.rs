//! Building an album: collecting, confirming, previewing and saving

use chrono::Utc;
use tracing::{debug, info};

use crate::bot::ui_builder::{
    create_collecting_keyboard, create_confirmation_keyboard, create_main_menu_keyboard,
};
use crate::bot::HandlerContext;
use crate::errors::{error_logging, AppResult};
use crate::session::SessionState;
use crate::validation::{validate_album_title, MAX_TITLE_CHARS};

/// Title used when the user never provided one
pub fn default_album_title(hc: &HandlerContext<'_>) -> String {
    let date = Utc::now().format("%Y-%m-%d").to_string();
    hc.t_args("default-album-title", &[("date", &date)])
}

pub fn summary_text(hc: &HandlerContext<'_>, title: &str, count: usize) -> String {
    let count = count.to_string();
    hc.t_args("album-summary", &[("title", title), ("count", &count)])
}

/// Open a fresh album, discarding anything collected before
pub async fn start_album(hc: &HandlerContext<'_>, title: Option<String>) -> AppResult<()> {
    let title = match title.as_deref().map(validate_album_title) {
        Some(Ok(title)) => Some(title),
        Some(Err(reason)) => {
            error_logging::log_validation_error(&reason, "album_title", Some(hc.chat_id.0), title.as_deref());
            let max = MAX_TITLE_CHARS.to_string();
            hc.send(&hc.t_args("title-invalid", &[("max", &max)]), None)
                .await?;
            None
        }
        None => None,
    };

    let previous = hc.ctx.sessions.get(hc.chat_id).await?;
    if let SessionState::AwaitingConfirmation { message_id, .. } = previous {
        hc.remove_keyboard(message_id).await;
    }

    hc.ctx
        .sessions
        .update(
            hc.chat_id,
            SessionState::AwaitingPhotos {
                photos: Vec::new(),
                title,
                last_media_group: None,
            },
        )
        .await?;
    debug!(chat_id = %hc.chat_id, "Album started");

    let max = hc.ctx.settings.max_photos_per_album.to_string();
    hc.send(
        &hc.t_args("album-started", &[("max", &max)]),
        Some(create_collecting_keyboard(hc)),
    )
    .await?;
    Ok(())
}

/// Done: move from collecting to confirmation
pub async fn finish_collecting(hc: &HandlerContext<'_>, state: SessionState) -> AppResult<()> {
    let SessionState::AwaitingPhotos { photos, title, .. } = state else {
        return Ok(());
    };

    if photos.is_empty() {
        hc.send(&hc.t("no-photos-yet"), Some(create_collecting_keyboard(hc)))
            .await?;
        return Ok(());
    }

    let shown_title = title.clone().unwrap_or_else(|| default_album_title(hc));
    let message_id = hc
        .send(
            &summary_text(hc, &shown_title, photos.len()),
            Some(create_confirmation_keyboard(hc)),
        )
        .await?;

    hc.ctx
        .sessions
        .update(
            hc.chat_id,
            SessionState::AwaitingConfirmation {
                photos,
                title,
                message_id: Some(message_id.0),
            },
        )
        .await?;
    Ok(())
}

/// Send the collected photos back as media groups
pub async fn preview_album(hc: &HandlerContext<'_>, state: SessionState) -> AppResult<()> {
    let SessionState::AwaitingConfirmation { photos, title, .. } = state else {
        return Ok(());
    };

    let caption = title.unwrap_or_else(|| default_album_title(hc));
    hc.ctx
        .api
        .send_photo_group(hc.chat_id, &photos, Some(&caption))
        .await
}

/// Persist the album and close the session
pub async fn save_album(hc: &HandlerContext<'_>, state: SessionState) -> AppResult<()> {
    let SessionState::AwaitingConfirmation {
        photos,
        title,
        message_id,
    } = state
    else {
        return Ok(());
    };

    let title = title.unwrap_or_else(|| default_album_title(hc));
    let store = &hc.ctx.store;

    let saved = async {
        store.upsert_user(hc.user_id, hc.language_code).await?;
        store.create_album(hc.user_id, &title, &photos).await
    }
    .await;

    let album_id = match saved {
        Ok(id) => id,
        Err(e) => {
            // The session is kept so the user can press Save again
            hc.send(&hc.t("save-failed"), None).await?;
            return Err(e);
        }
    };
    info!(chat_id = %hc.chat_id, album_id, photos = photos.len(), "Album saved");

    hc.ctx.sessions.reset(hc.chat_id).await?;
    hc.remove_keyboard(message_id).await;

    let count = photos.len().to_string();
    hc.send(
        &hc.t_args("album-saved", &[("title", &title), ("count", &count)]),
        Some(create_main_menu_keyboard(hc)),
    )
    .await?;
    Ok(())
}
