//! UI Builder module for creating keyboards

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::CallbackAction;
use super::HandlerContext;
use crate::store::Album;
use crate::validation::truncate_label;

const ALBUM_BUTTON_CHARS: usize = 30;

fn button(text: String, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_data())
}

/// "New album" / "My albums" shown after /start
pub fn create_main_menu_keyboard(hc: &HandlerContext<'_>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(hc.t("menu-new-album"), CallbackAction::NewAlbum),
        button(hc.t("menu-my-albums"), CallbackAction::AlbumsPage(0)),
    ]])
}

/// Keyboard attached while photos are being collected
pub fn create_collecting_keyboard(hc: &HandlerContext<'_>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(hc.t("button-done"), CallbackAction::Done),
        button(hc.t("button-cancel"), CallbackAction::Cancel),
    ]])
}

pub fn create_confirmation_keyboard(hc: &HandlerContext<'_>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(hc.t("button-preview"), CallbackAction::Preview),
            button(hc.t("button-save"), CallbackAction::Save),
        ],
        vec![button(hc.t("button-cancel"), CallbackAction::Cancel)],
    ])
}

/// Total pages for `total` items, never less than one
pub fn total_pages(total: i64, page_size: usize) -> usize {
    (total.max(0) as usize).div_ceil(page_size.max(1)).max(1)
}

/// One button per album plus a navigation row when there are several pages
pub fn create_albums_pagination_keyboard(
    hc: &HandlerContext<'_>,
    albums: &[Album],
    current_page: usize,
    total_count: i64,
    page_size: usize,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = albums
        .iter()
        .map(|album| {
            let label = format!(
                "{} ({})",
                truncate_label(&album.title, ALBUM_BUTTON_CHARS),
                album.photo_count
            );
            vec![button(label, CallbackAction::ViewAlbum(album.id))]
        })
        .collect();

    let pages = total_pages(total_count, page_size);
    if pages > 1 {
        let mut nav = Vec::new();
        if current_page > 0 {
            nav.push(button(
                hc.t("button-previous"),
                CallbackAction::AlbumsPage(current_page - 1),
            ));
        }
        nav.push(button(
            format!("{}/{}", current_page + 1, pages),
            CallbackAction::Noop,
        ));
        if current_page + 1 < pages {
            nav.push(button(
                hc.t("button-next"),
                CallbackAction::AlbumsPage(current_page + 1),
            ));
        }
        rows.push(nav);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Actions offered under a viewed album
pub fn create_album_actions_keyboard(hc: &HandlerContext<'_>, album_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(hc.t("button-delete"), CallbackAction::DeleteAlbum(album_id)),
        button(hc.t("button-back"), CallbackAction::BackToAlbums),
    ]])
}

pub fn create_delete_confirmation_keyboard(
    hc: &HandlerContext<'_>,
    album_id: i64,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(hc.t("button-confirm-delete"), CallbackAction::ConfirmDelete(album_id)),
        button(hc.t("button-cancel"), CallbackAction::BackToAlbums),
    ]])
}
