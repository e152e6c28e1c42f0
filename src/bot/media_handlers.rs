//! Media Handlers module for processing photo messages

use tracing::debug;

use super::ui_builder::{create_collecting_keyboard, create_main_menu_keyboard};
use super::HandlerContext;
use crate::errors::AppResult;
use crate::session::SessionState;
use crate::validation::validate_album_title;

/// Add a photo to the album being collected
///
/// Telegram delivers a media group as one update per photo sharing a
/// `media_group_id`; the group is acknowledged once, on its first photo.
pub async fn handle_photo_message(
    hc: &HandlerContext<'_>,
    state: SessionState,
    file_id: String,
    caption: Option<String>,
    media_group_id: Option<String>,
) -> AppResult<()> {
    let SessionState::AwaitingPhotos {
        mut photos,
        mut title,
        last_media_group,
    } = state
    else {
        return handle_photo_outside_session(hc).await;
    };

    let max = hc.ctx.settings.max_photos_per_album;
    let max_text = max.to_string();
    let same_group = media_group_id.is_some() && media_group_id == last_media_group;

    if photos.len() >= max {
        debug!(chat_id = %hc.chat_id, max, "Album full, photo skipped");
        hc.ctx
            .sessions
            .update(
                hc.chat_id,
                SessionState::AwaitingPhotos {
                    photos,
                    title,
                    last_media_group: media_group_id,
                },
            )
            .await?;
        if !same_group {
            hc.send(&hc.t_args("album-full", &[("max", &max_text)]), None)
                .await?;
        }
        return Ok(());
    }

    photos.push(file_id);
    if title.is_none() {
        title = caption
            .as_deref()
            .and_then(|c| validate_album_title(c).ok());
    }
    let count = photos.len();

    hc.ctx
        .sessions
        .update(
            hc.chat_id,
            SessionState::AwaitingPhotos {
                photos,
                title,
                last_media_group: media_group_id.clone(),
            },
        )
        .await?;
    debug!(chat_id = %hc.chat_id, count, media_group = ?media_group_id, "Photo added");

    if count == max {
        hc.send(
            &hc.t_args("album-full", &[("max", &max_text)]),
            Some(create_collecting_keyboard(hc)),
        )
        .await?;
    } else if media_group_id.is_none() {
        let count_text = count.to_string();
        hc.send(
            &hc.t_args("photo-added", &[("count", &count_text)]),
            Some(create_collecting_keyboard(hc)),
        )
        .await?;
    } else if !same_group {
        hc.send(&hc.t("photo-group-added"), Some(create_collecting_keyboard(hc)))
            .await?;
    }
    Ok(())
}

pub async fn handle_photo_outside_session(hc: &HandlerContext<'_>) -> AppResult<()> {
    hc.send(
        &hc.t("photo-outside-session"),
        Some(create_main_menu_keyboard(hc)),
    )
    .await?;
    Ok(())
}
