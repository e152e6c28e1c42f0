//! Routing of normalized events to handlers.
//!
//! [`route`] is a pure function of the event and the chat's current session
//! state; [`dispatch`] loads the state, answers callback queries and runs the
//! chosen handler.

use std::time::Instant;

use tracing::debug;

use super::callbacks::{album_callbacks, library_callbacks, CallbackAction};
use super::{command_handlers, media_handlers, message_handler, BotContext, HandlerContext};
use crate::errors::{error_logging, AppResult};
use crate::events::{EventKind, InboundEvent};
use crate::observability;
use crate::session::SessionState;

/// What to do with one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    Help,
    /// `/new [title]` or the "New album" button
    NewAlbum { title: Option<String> },
    Cancel,
    /// Saved albums list; edits `message_id` in place when set
    ShowAlbums { page: usize, message_id: Option<i32> },
    UnknownCommand(String),
    AddPhoto {
        file_id: String,
        caption: Option<String>,
        media_group_id: Option<String>,
    },
    PhotoOutsideSession,
    SetTitle(String),
    IdleText,
    FinishCollecting,
    Preview,
    Save,
    ViewAlbum(i64),
    AskDelete { album_id: i64, message_id: Option<i32> },
    ConfirmDelete { album_id: i64, message_id: Option<i32> },
    /// Button from a step the chat is no longer in
    StaleCallback,
    UnknownCallback,
    Ignore,
}

impl Route {
    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Route::Start => "start",
            Route::Help => "help",
            Route::NewAlbum { .. } => "new_album",
            Route::Cancel => "cancel",
            Route::ShowAlbums { .. } => "show_albums",
            Route::UnknownCommand(_) => "unknown_command",
            Route::AddPhoto { .. } => "add_photo",
            Route::PhotoOutsideSession => "photo_outside_session",
            Route::SetTitle(_) => "set_title",
            Route::IdleText => "idle_text",
            Route::FinishCollecting => "finish_collecting",
            Route::Preview => "preview",
            Route::Save => "save",
            Route::ViewAlbum(_) => "view_album",
            Route::AskDelete { .. } => "ask_delete",
            Route::ConfirmDelete { .. } => "confirm_delete",
            Route::StaleCallback => "stale_callback",
            Route::UnknownCallback => "unknown_callback",
            Route::Ignore => "ignore",
        }
    }
}

/// Pick the handler for `event` given the chat's current state
pub fn route(event: &InboundEvent, state: &SessionState) -> Route {
    match &event.kind {
        EventKind::Command { name, args } => match name.as_str() {
            "start" => Route::Start,
            "help" => Route::Help,
            "new" => Route::NewAlbum {
                title: Some(args.clone()).filter(|a| !a.is_empty()),
            },
            "albums" => Route::ShowAlbums {
                page: 0,
                message_id: None,
            },
            "cancel" => Route::Cancel,
            other => Route::UnknownCommand(other.to_string()),
        },
        EventKind::Text(text) => {
            if state.is_idle() {
                Route::IdleText
            } else {
                Route::SetTitle(text.clone())
            }
        }
        EventKind::Photo {
            file_id,
            caption,
            media_group_id,
        } => match state {
            SessionState::AwaitingPhotos { .. } => Route::AddPhoto {
                file_id: file_id.clone(),
                caption: caption.clone(),
                media_group_id: media_group_id.clone(),
            },
            _ => Route::PhotoOutsideSession,
        },
        EventKind::Callback {
            data, message_id, ..
        } => match CallbackAction::parse(data) {
            Some(action) => route_callback(action, *message_id, state),
            None => Route::UnknownCallback,
        },
    }
}

fn route_callback(action: CallbackAction, message_id: Option<i32>, state: &SessionState) -> Route {
    // Confirmation buttons only count on the message that carries the current summary
    let on_current_summary = match state {
        SessionState::AwaitingConfirmation {
            message_id: Some(current),
            ..
        } => message_id.is_none_or(|pressed| pressed == *current),
        SessionState::AwaitingConfirmation { .. } => true,
        _ => false,
    };

    match action {
        CallbackAction::NewAlbum => Route::NewAlbum { title: None },
        CallbackAction::Done => match state {
            SessionState::AwaitingPhotos { .. } => Route::FinishCollecting,
            _ => Route::StaleCallback,
        },
        CallbackAction::Preview if on_current_summary => Route::Preview,
        CallbackAction::Save if on_current_summary => Route::Save,
        CallbackAction::Preview | CallbackAction::Save => Route::StaleCallback,
        CallbackAction::Cancel => match state {
            SessionState::AwaitingPhotos { .. } => Route::Cancel,
            SessionState::AwaitingConfirmation { .. } if on_current_summary => Route::Cancel,
            _ => Route::StaleCallback,
        },
        CallbackAction::AlbumsPage(page) => Route::ShowAlbums { page, message_id },
        CallbackAction::BackToAlbums => Route::ShowAlbums {
            page: 0,
            message_id,
        },
        CallbackAction::ViewAlbum(id) => Route::ViewAlbum(id),
        CallbackAction::DeleteAlbum(album_id) => Route::AskDelete {
            album_id,
            message_id,
        },
        CallbackAction::ConfirmDelete(album_id) => Route::ConfirmDelete {
            album_id,
            message_id,
        },
        CallbackAction::Noop => Route::Ignore,
    }
}

/// Handle one event end to end
pub async fn dispatch(ctx: &BotContext, event: &InboundEvent) -> AppResult<()> {
    let state = ctx.sessions.get(event.chat_id).await?;
    let route = route(event, &state);
    let hc = HandlerContext::new(ctx, event);

    debug!(
        chat_id = %event.chat_id,
        kind = event.kind_label(),
        state = state.label(),
        route = route.label(),
        "Dispatching event"
    );

    // Answer first so the client stops its spinner even if the handler is slow or fails
    if let EventKind::Callback { id, .. } = &event.kind {
        let notice = matches!(route, Route::StaleCallback).then(|| hc.t("session-expired"));
        if let Err(e) = ctx.api.answer_callback(id, notice.as_deref()).await {
            error_logging::log_handler_error(&e, "answer_callback", event.chat_id.0, event.user_id());
        }
    }

    let label = route.label();
    let start = Instant::now();
    let result = execute(&hc, route, state).await;
    observability::record_handler_metrics(label, result.is_ok(), start.elapsed());
    result
}

async fn execute(hc: &HandlerContext<'_>, route: Route, state: SessionState) -> AppResult<()> {
    match route {
        Route::Start => command_handlers::handle_start_command(hc).await,
        Route::Help => command_handlers::handle_help_command(hc).await,
        Route::NewAlbum { title } => album_callbacks::start_album(hc, title).await,
        Route::Cancel => command_handlers::handle_cancel_command(hc, state).await,
        Route::ShowAlbums { page, message_id } => {
            library_callbacks::show_albums_page(hc, page, message_id).await
        }
        Route::UnknownCommand(name) => command_handlers::handle_unknown_command(hc, &name).await,
        Route::AddPhoto {
            file_id,
            caption,
            media_group_id,
        } => {
            media_handlers::handle_photo_message(hc, state, file_id, caption, media_group_id).await
        }
        Route::PhotoOutsideSession => media_handlers::handle_photo_outside_session(hc).await,
        Route::SetTitle(text) => message_handler::handle_title_text(hc, state, &text).await,
        Route::IdleText => message_handler::handle_idle_text(hc).await,
        Route::FinishCollecting => album_callbacks::finish_collecting(hc, state).await,
        Route::Preview => album_callbacks::preview_album(hc, state).await,
        Route::Save => album_callbacks::save_album(hc, state).await,
        Route::ViewAlbum(album_id) => library_callbacks::view_album(hc, album_id).await,
        Route::AskDelete {
            album_id,
            message_id,
        } => library_callbacks::ask_delete(hc, album_id, message_id).await,
        Route::ConfirmDelete {
            album_id,
            message_id,
        } => library_callbacks::confirm_delete(hc, album_id, message_id).await,
        Route::StaleCallback | Route::UnknownCallback | Route::Ignore => Ok(()),
    }
}
