//! Bot module for handling Telegram interactions
//!
//! - `dispatcher`: Routes normalized events to handlers
//! - `command_handlers`: Slash commands
//! - `message_handler`: Plain text (album titles)
//! - `media_handlers`: Incoming photos
//! - `callbacks`: Inline keyboard callback queries
//! - `ui_builder`: Keyboards

pub mod callbacks;
pub mod command_handlers;
pub mod dispatcher;
pub mod media_handlers;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};

use crate::config::BotConfig;
use crate::errors::AppResult;
use crate::events::InboundEvent;
use crate::localization::LocalizationManager;
use crate::outbound::BotApi;
use crate::session::SessionStore;
use crate::store::BotStore;

pub use dispatcher::{dispatch, route, Route};

/// Tunables handlers need at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotSettings {
    pub max_photos_per_album: usize,
    pub albums_page_size: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self::from(&BotConfig::default())
    }
}

impl From<&BotConfig> for BotSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            max_photos_per_album: config.max_photos_per_album,
            albums_page_size: config.albums_page_size,
        }
    }
}

/// Shared dependencies of every handler
#[derive(Clone)]
pub struct BotContext {
    pub api: Arc<dyn BotApi>,
    pub sessions: Arc<dyn SessionStore>,
    pub store: Arc<dyn BotStore>,
    pub localization: Arc<LocalizationManager>,
    pub settings: BotSettings,
}

/// Per-event view of [`BotContext`]
pub struct HandlerContext<'a> {
    pub ctx: &'a BotContext,
    pub chat_id: ChatId,
    /// Owner key for stored albums; the chat id when the sender is unknown
    pub user_id: i64,
    pub first_name: &'a str,
    pub language_code: Option<&'a str>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(ctx: &'a BotContext, event: &'a InboundEvent) -> Self {
        Self {
            ctx,
            chat_id: event.chat_id,
            user_id: event.user_id().unwrap_or(event.chat_id.0),
            first_name: event
                .sender
                .as_ref()
                .map(|s| s.first_name.as_str())
                .unwrap_or_default(),
            language_code: event.language_code(),
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.ctx.localization.t(key, self.language_code)
    }

    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.ctx.localization.t_args(key, args, self.language_code)
    }

    /// Send a text message to the current chat
    pub async fn send(
        &self,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageId> {
        self.ctx.api.send_text(self.chat_id, text, keyboard).await
    }

    /// Rewrite the message a button was pressed on, or send a fresh one
    pub async fn edit_or_send(
        &self,
        message_id: Option<i32>,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        match message_id {
            Some(id) => {
                self.ctx
                    .api
                    .edit_text(self.chat_id, MessageId(id), text, keyboard)
                    .await
            }
            None => self.send(text, keyboard).await.map(|_| ()),
        }
    }

    /// Drop the inline keyboard from an earlier message; failures only get logged
    pub async fn remove_keyboard(&self, message_id: Option<i32>) {
        let Some(id) = message_id else {
            return;
        };
        if let Err(e) = self
            .ctx
            .api
            .edit_keyboard(self.chat_id, MessageId(id), None)
            .await
        {
            tracing::warn!(chat_id = %self.chat_id, message_id = id, error = %e, "Could not remove keyboard");
        }
    }
}
