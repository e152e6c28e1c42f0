//! Shared fixtures: a recording Bot API and Telegram update builders.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use photo_album_bot::bot::{BotContext, BotSettings};
use photo_album_bot::errors::{AppError, AppResult};
use photo_album_bot::localization::create_localization_manager;
use photo_album_bot::outbound::BotApi;
use photo_album_bot::session::MemorySessionStore;
use photo_album_bot::store::{BotStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use teloxide::types::{
    CallbackQueryId, ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, Update,
};

pub mod telegram_stub;

pub const CHAT_ID: i64 = 42;
pub const DATE: i64 = 1_700_000_000;

/// One recorded outbound call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendText {
        chat_id: i64,
        message_id: i32,
        text: String,
        buttons: Vec<String>,
    },
    EditText {
        chat_id: i64,
        message_id: i32,
        text: String,
        buttons: Vec<String>,
    },
    EditKeyboard {
        chat_id: i64,
        message_id: i32,
        buttons: Option<Vec<String>>,
    },
    SendPhotoGroup {
        chat_id: i64,
        photos: Vec<String>,
        caption: Option<String>,
    },
    AnswerCallback {
        id: String,
        text: Option<String>,
    },
}

/// Callback data of every button, row by row
pub fn button_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
    keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// [`BotApi`] that records calls instead of talking to Telegram
#[derive(Debug)]
pub struct MockBotApi {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI32,
    fail_sends: AtomicBool,
}

impl Default for MockBotApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(100),
            fail_sends: AtomicBool::new(false),
        }
    }
}

impl MockBotApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Make every `send_text` fail from now on
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_sent(&self) -> Option<(i32, String, Vec<String>)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::SendText {
                message_id,
                text,
                buttons,
                ..
            } => Some((message_id, text, buttons)),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl BotApi for MockBotApi {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageId> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::Telegram("Forbidden: bot was blocked by the user".to_string()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.record(Call::SendText {
            chat_id: chat_id.0,
            message_id,
            text: text.to_string(),
            buttons: keyboard.as_ref().map(button_data).unwrap_or_default(),
        });
        Ok(MessageId(message_id))
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        self.record(Call::EditText {
            chat_id: chat_id.0,
            message_id: message_id.0,
            text: text.to_string(),
            buttons: keyboard.as_ref().map(button_data).unwrap_or_default(),
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        self.record(Call::EditKeyboard {
            chat_id: chat_id.0,
            message_id: message_id.0,
            buttons: keyboard.as_ref().map(button_data),
        });
        Ok(())
    }

    async fn send_photo_group(
        &self,
        chat_id: ChatId,
        photos: &[String],
        caption: Option<&str>,
    ) -> AppResult<()> {
        self.record(Call::SendPhotoGroup {
            chat_id: chat_id.0,
            photos: photos.to_vec(),
            caption: caption.map(ToString::to_string),
        });
        Ok(())
    }

    async fn answer_callback(&self, id: &CallbackQueryId, text: Option<&str>) -> AppResult<()> {
        self.record(Call::AnswerCallback {
            id: id.0.clone(),
            text: text.map(ToString::to_string),
        });
        Ok(())
    }
}

/// Everything a dispatcher test needs to drive and inspect the bot
pub struct TestBot {
    pub ctx: BotContext,
    pub api: Arc<MockBotApi>,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_settings(BotSettings {
            max_photos_per_album: 3,
            albums_page_size: 2,
        })
    }

    pub fn with_settings(settings: BotSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(settings, store.clone(), store)
    }

    /// Use `bot_store` for persistence; `store` stays inspectable by the test
    pub fn with_store(
        settings: BotSettings,
        bot_store: Arc<dyn BotStore>,
        store: Arc<MemoryStore>,
    ) -> Self {
        let api = Arc::new(MockBotApi::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let ctx = BotContext {
            api: api.clone(),
            sessions: sessions.clone(),
            store: bot_store,
            localization: create_localization_manager().expect("locales load"),
            settings,
        };
        Self {
            ctx,
            api,
            store,
            sessions,
        }
    }

    pub async fn send(&self, update: Update) {
        photo_album_bot::app::process_update(&self.ctx, update).await;
    }
}

fn user_json(user_id: i64) -> Value {
    json!({
        "id": user_id,
        "is_bot": false,
        "first_name": "Ann",
        "language_code": "en"
    })
}

fn chat_json(chat_id: i64) -> Value {
    json!({ "id": chat_id, "type": "private", "first_name": "Ann" })
}

pub fn parse_update(value: Value) -> Update {
    // Parse from text: teloxide's `UpdateKind` visitor needs borrowed keys, which `from_value` cannot provide
    serde_json::from_str(&value.to_string()).expect("valid update json")
}

pub fn text_update_json(update_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id + 1000,
            "date": DATE,
            "chat": chat_json(chat_id),
            "from": user_json(chat_id),
            "text": text
        }
    })
}

pub fn text_update(update_id: i64, text: &str) -> Update {
    parse_update(text_update_json(update_id, CHAT_ID, text))
}

pub fn photo_update(
    update_id: i64,
    file_id: &str,
    caption: Option<&str>,
    media_group_id: Option<&str>,
) -> Update {
    let mut message = json!({
        "message_id": update_id + 1000,
        "date": DATE,
        "chat": chat_json(CHAT_ID),
        "from": user_json(CHAT_ID),
        "photo": [
            { "file_id": format!("{file_id}-thumb"), "file_unique_id": "thumb", "width": 90, "height": 90, "file_size": 1200 },
            { "file_id": file_id, "file_unique_id": format!("{file_id}-u"), "width": 1280, "height": 960, "file_size": 180000 }
        ]
    });
    if let Some(caption) = caption {
        message["caption"] = json!(caption);
    }
    if let Some(group) = media_group_id {
        message["media_group_id"] = json!(group);
    }
    parse_update(json!({ "update_id": update_id, "message": message }))
}

pub fn callback_update(update_id: i64, data: &str, message_id: i32) -> Update {
    parse_update(json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{update_id}"),
            "from": user_json(CHAT_ID),
            "chat_instance": "instance-1",
            "data": data,
            "message": {
                "message_id": message_id,
                "date": DATE,
                "chat": chat_json(CHAT_ID),
                "from": { "id": 999, "is_bot": true, "first_name": "Albums", "username": "album_bot" },
                "text": "menu"
            }
        }
    }))
}

pub fn edited_message_update(update_id: i64) -> Update {
    parse_update(json!({
        "update_id": update_id,
        "edited_message": {
            "message_id": 7,
            "date": DATE,
            "edit_date": DATE + 60,
            "chat": chat_json(CHAT_ID),
            "from": user_json(CHAT_ID),
            "text": "edited"
        }
    }))
}
