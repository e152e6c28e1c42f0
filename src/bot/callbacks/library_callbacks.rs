//! Saved albums: paginated list, viewing and deletion

use tracing::{debug, info};

use crate::bot::ui_builder::{
    create_album_actions_keyboard, create_albums_pagination_keyboard,
    create_delete_confirmation_keyboard, create_main_menu_keyboard, total_pages,
};
use crate::bot::HandlerContext;
use crate::errors::AppResult;

/// Show one page of the user's albums; out-of-range pages clamp to the last one
pub async fn show_albums_page(
    hc: &HandlerContext<'_>,
    page: usize,
    message_id: Option<i32>,
) -> AppResult<()> {
    let store = &hc.ctx.store;
    let page_size = hc.ctx.settings.albums_page_size.max(1);

    let total = store.count_albums(hc.user_id).await?;
    if total == 0 {
        return hc
            .edit_or_send(message_id, &hc.t("albums-empty"), Some(create_main_menu_keyboard(hc)))
            .await;
    }

    let pages = total_pages(total, page_size);
    let page = page.min(pages - 1);
    let albums = store
        .list_albums(hc.user_id, page_size as i64, (page * page_size) as i64)
        .await?;
    debug!(user_id = hc.user_id, page, pages, shown = albums.len(), "Listing albums");

    let header = hc.t_args(
        "albums-header",
        &[("page", &(page + 1).to_string()), ("pages", &pages.to_string())],
    );
    let keyboard = create_albums_pagination_keyboard(hc, &albums, page, total, page_size);
    hc.edit_or_send(message_id, &header, Some(keyboard)).await
}

/// Resend a saved album followed by its actions
pub async fn view_album(hc: &HandlerContext<'_>, album_id: i64) -> AppResult<()> {
    let Some((album, photos)) = hc.ctx.store.get_album(hc.user_id, album_id).await? else {
        hc.send(&hc.t("album-not-found"), None).await?;
        return Ok(());
    };

    hc.ctx
        .api
        .send_photo_group(hc.chat_id, &photos, Some(&album.title))
        .await?;

    let count = photos.len().to_string();
    hc.send(
        &hc.t_args("album-view", &[("title", &album.title), ("count", &count)]),
        Some(create_album_actions_keyboard(hc, album.id)),
    )
    .await?;
    Ok(())
}

/// Ask before deleting
pub async fn ask_delete(
    hc: &HandlerContext<'_>,
    album_id: i64,
    message_id: Option<i32>,
) -> AppResult<()> {
    let Some((album, _)) = hc.ctx.store.get_album(hc.user_id, album_id).await? else {
        return hc
            .edit_or_send(message_id, &hc.t("album-not-found"), None)
            .await;
    };

    hc.edit_or_send(
        message_id,
        &hc.t_args("confirm-delete", &[("title", &album.title)]),
        Some(create_delete_confirmation_keyboard(hc, album.id)),
    )
    .await
}

pub async fn confirm_delete(
    hc: &HandlerContext<'_>,
    album_id: i64,
    message_id: Option<i32>,
) -> AppResult<()> {
    let deleted = hc.ctx.store.delete_album(hc.user_id, album_id).await?;
    let key = if deleted {
        info!(user_id = hc.user_id, album_id, "Album deleted");
        "album-deleted"
    } else {
        "album-not-found"
    };

    hc.edit_or_send(message_id, &hc.t(key), None).await?;
    show_albums_page(hc, 0, None).await
}
