//! Callback data carried by inline keyboard buttons
//!
//! Telegram limits callback data to 64 bytes, so payloads are short
//! `scope:action[:arg]` strings.

/// Every button the bot renders maps to one of these
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Start collecting a new album
    NewAlbum,
    /// Stop collecting and show the summary
    Done,
    Preview,
    Save,
    /// Abandon the album in progress
    Cancel,
    /// Zero-based page of the saved albums list
    AlbumsPage(usize),
    ViewAlbum(i64),
    DeleteAlbum(i64),
    ConfirmDelete(i64),
    BackToAlbums,
    /// Page indicator, does nothing
    Noop,
}

impl CallbackAction {
    /// Parse button data; unknown or malformed payloads yield `None`
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        let scope = parts.next()?;
        let action = parts.next().unwrap_or_default();
        let arg = parts.next();

        let action = match (scope, action, arg) {
            ("album", "new", None) => CallbackAction::NewAlbum,
            ("album", "done", None) => CallbackAction::Done,
            ("album", "preview", None) => CallbackAction::Preview,
            ("album", "save", None) => CallbackAction::Save,
            ("album", "cancel", None) => CallbackAction::Cancel,
            ("albums", "page", Some(n)) => CallbackAction::AlbumsPage(n.parse().ok()?),
            ("albums", "view", Some(id)) => CallbackAction::ViewAlbum(id.parse().ok()?),
            ("albums", "delete", Some(id)) => CallbackAction::DeleteAlbum(id.parse().ok()?),
            ("albums", "confirm_delete", Some(id)) => {
                CallbackAction::ConfirmDelete(id.parse().ok()?)
            }
            ("albums", "back", None) => CallbackAction::BackToAlbums,
            ("noop", "", None) => CallbackAction::Noop,
            _ => return None,
        };
        Some(action)
    }

    pub fn to_data(self) -> String {
        match self {
            CallbackAction::NewAlbum => "album:new".to_string(),
            CallbackAction::Done => "album:done".to_string(),
            CallbackAction::Preview => "album:preview".to_string(),
            CallbackAction::Save => "album:save".to_string(),
            CallbackAction::Cancel => "album:cancel".to_string(),
            CallbackAction::AlbumsPage(page) => format!("albums:page:{page}"),
            CallbackAction::ViewAlbum(id) => format!("albums:view:{id}"),
            CallbackAction::DeleteAlbum(id) => format!("albums:delete:{id}"),
            CallbackAction::ConfirmDelete(id) => format!("albums:confirm_delete:{id}"),
            CallbackAction::BackToAlbums => "albums:back".to_string(),
            CallbackAction::Noop => "noop".to_string(),
        }
    }
}
