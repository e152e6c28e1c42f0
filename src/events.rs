//! Normalized inbound events.
//!
//! Ingress adapters hand raw Telegram [`Update`]s to the dispatcher, which
//! first reduces them to an [`InboundEvent`]. Everything the bot does not
//! handle (edited messages, stickers, channel posts, ...) maps to `None`.

use teloxide::types::{CallbackQuery, CallbackQueryId, ChatId, Message, Update, UpdateKind, User};

/// Who triggered the event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub first_name: String,
    pub language_code: Option<String>,
}

impl From<&User> for Sender {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.0 as i64,
            first_name: user.first_name.clone(),
            language_code: user.language_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name args`
    Command { name: String, args: String },
    Text(String),
    Photo {
        /// File id of the largest available size
        file_id: String,
        caption: Option<String>,
        media_group_id: Option<String>,
    },
    /// Inline keyboard button press
    Callback {
        id: CallbackQueryId,
        data: String,
        message_id: Option<i32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub sender: Option<Sender>,
    pub kind: EventKind,
}

impl InboundEvent {
    /// Reduce an update to the event the bot reacts to, if any
    pub fn from_update(update: &Update) -> Option<Self> {
        match &update.kind {
            UpdateKind::Message(msg) => Self::from_message(msg),
            UpdateKind::CallbackQuery(query) => Self::from_callback(query),
            _ => None,
        }
    }

    fn from_message(msg: &Message) -> Option<Self> {
        let kind = if let Some(text) = msg.text() {
            match parse_command(text) {
                Some((name, args)) => EventKind::Command { name, args },
                None => EventKind::Text(text.to_string()),
            }
        } else if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
            EventKind::Photo {
                file_id: largest.file.id.0.clone(),
                caption: msg.caption().map(ToString::to_string),
                media_group_id: msg.media_group_id().map(ToString::to_string),
            }
        } else {
            return None;
        };

        Some(Self {
            chat_id: msg.chat.id,
            sender: msg.from.as_ref().map(Sender::from),
            kind,
        })
    }

    fn from_callback(query: &CallbackQuery) -> Option<Self> {
        let data = query.data.clone()?;
        // Inline-mode buttons have no message; answer in the presser's private chat
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat().id)
            .unwrap_or(ChatId(query.from.id.0 as i64));

        Some(Self {
            chat_id,
            sender: Some(Sender::from(&query.from)),
            kind: EventKind::Callback {
                id: query.id.clone(),
                data,
                message_id: query.message.as_ref().map(|m| m.id().0),
            },
        })
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|s| s.user_id)
    }

    pub fn language_code(&self) -> Option<&str> {
        self.sender.as_ref().and_then(|s| s.language_code.as_deref())
    }

    /// Short label used in logs and metrics
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            EventKind::Command { .. } => "command",
            EventKind::Text(_) => "text",
            EventKind::Photo { .. } => "photo",
            EventKind::Callback { .. } => "callback",
        }
    }
}

/// Split `/Name@bot some args` into `("name", "some args")`
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.to_string()))
}
