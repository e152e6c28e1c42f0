//! Outbound Bot API calls.
//!
//! Handlers talk to Telegram only through [`BotApi`], so dispatcher flows can
//! be driven in tests by a recording implementation. [`TelegramApi`] is the
//! production implementation over a teloxide [`Bot`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto,
    MessageId,
};
use teloxide::{ApiError, RequestError};

use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;

/// Telegram refuses media groups with more items than this
pub const MEDIA_GROUP_LIMIT: usize = 10;

const MAX_ATTEMPTS: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 5_000;

#[async_trait]
pub trait BotApi: Send + Sync {
    /// Send a text message, optionally with an inline keyboard
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageId>;

    /// Replace the text (and keyboard) of a message the bot sent
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()>;

    /// Replace or, with `None`, remove a message's inline keyboard
    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()>;

    /// Deliver photos as one or more media groups
    async fn send_photo_group(
        &self,
        chat_id: ChatId,
        photos: &[String],
        caption: Option<&str>,
    ) -> AppResult<()>;

    /// Acknowledge a button press, optionally with a toast
    async fn answer_callback(&self, id: &CallbackQueryId, text: Option<&str>) -> AppResult<()>;
}

/// Split photos into sendable media groups
pub fn media_group_chunks(photos: &[String]) -> Vec<&[String]> {
    photos.chunks(MEDIA_GROUP_LIMIT).collect()
}

/// Exponential backoff with up to 25% jitter
pub fn retry_delay(attempt: u32) -> Duration {
    let exponential = BASE_RETRY_DELAY_MS.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    let delay = exponential.min(MAX_RETRY_DELAY_MS);
    let jitter = rand::random::<u64>() % (delay / 4).max(1);
    Duration::from_millis(delay + jitter)
}

fn is_transient(err: &RequestError) -> bool {
    matches!(err, RequestError::Network(_) | RequestError::RetryAfter(_) | RequestError::Io(_))
}

/// Production [`BotApi`] backed by teloxide
#[derive(Debug, Clone)]
pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Run `call` until it succeeds, fails permanently, or runs out of attempts
    async fn with_retry<T, F, Fut>(
        &self,
        method: &'static str,
        chat_id: Option<ChatId>,
        mut call: F,
    ) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => {
                    observability::record_outbound_call(method, true, attempt);
                    return Ok(value);
                }
                Err(err) if is_transient(&err) && attempt < MAX_ATTEMPTS => {
                    let delay = match &err {
                        RequestError::RetryAfter(secs) => secs.duration(),
                        _ => retry_delay(attempt),
                    };
                    tracing::warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient Telegram error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    observability::record_outbound_call(method, false, attempt);
                    error_logging::log_telegram_error(&err, method, chat_id.map(|c| c.0), Some(attempt));
                    return Err(AppError::from(err));
                }
            }
        }
    }
}

/// Editing to identical content is not a failure
fn ignore_not_modified(result: AppResult<()>, err_text: &str) -> AppResult<()> {
    match result {
        Err(AppError::Telegram(msg)) if msg.contains(err_text) => Ok(()),
        other => other,
    }
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageId> {
        let message = self
            .with_retry("sendMessage", Some(chat_id), || {
                let mut request = self.bot.send_message(chat_id, text.to_string());
                if let Some(keyboard) = keyboard.clone() {
                    request = request.reply_markup(keyboard);
                }
                request.send()
            })
            .await?;
        Ok(message.id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let result = self
            .with_retry("editMessageText", Some(chat_id), || {
                let mut request = self
                    .bot
                    .edit_message_text(chat_id, message_id, text.to_string());
                if let Some(keyboard) = keyboard.clone() {
                    request = request.reply_markup(keyboard);
                }
                request.send()
            })
            .await
            .map(|_| ());
        ignore_not_modified(result, &ApiError::MessageNotModified.to_string())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let result = self
            .with_retry("editMessageReplyMarkup", Some(chat_id), || {
                let mut request = self.bot.edit_message_reply_markup(chat_id, message_id);
                if let Some(keyboard) = keyboard.clone() {
                    request = request.reply_markup(keyboard);
                }
                request.send()
            })
            .await
            .map(|_| ());
        ignore_not_modified(result, &ApiError::MessageNotModified.to_string())
    }

    async fn send_photo_group(
        &self,
        chat_id: ChatId,
        photos: &[String],
        caption: Option<&str>,
    ) -> AppResult<()> {
        for (index, chunk) in media_group_chunks(photos).into_iter().enumerate() {
            // Caption only on the very first photo delivered
            let caption = if index == 0 { caption } else { None };

            if let [single] = chunk {
                self.with_retry("sendPhoto", Some(chat_id), || {
                    let mut request = self
                        .bot
                        .send_photo(chat_id, InputFile::file_id(FileId(single.clone())));
                    if let Some(caption) = caption {
                        request = request.caption(caption.to_string());
                    }
                    request.send()
                })
                .await?;
                continue;
            }

            self.with_retry("sendMediaGroup", Some(chat_id), || {
                let media: Vec<InputMedia> = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, file_id)| {
                        let mut photo = InputMediaPhoto::new(InputFile::file_id(FileId(file_id.clone())));
                        if i == 0 {
                            if let Some(caption) = caption {
                                photo = photo.caption(caption.to_string());
                            }
                        }
                        InputMedia::Photo(photo)
                    })
                    .collect();
                self.bot.send_media_group(chat_id, media).send()
            })
            .await?;
        }
        Ok(())
    }

    async fn answer_callback(&self, id: &CallbackQueryId, text: Option<&str>) -> AppResult<()> {
        self.with_retry("answerCallbackQuery", None, || {
            let mut request = self.bot.answer_callback_query(id.clone());
            if let Some(text) = text {
                request = request.text(text.to_string());
            }
            request.send()
        })
        .await
        .map(|_| ())
    }
}
