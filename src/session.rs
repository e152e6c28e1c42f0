//! Per-chat conversation state.
//!
//! Each chat is in exactly one [`SessionState`]. Handlers read it before acting
//! and write the next state back through a [`SessionStore`].

use crate::errors::AppResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use teloxide::types::ChatId;

/// Represents the conversation state of one chat
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingPhotos {
        photos: Vec<String>, // Telegram file ids, in arrival order
        title: Option<String>,
        last_media_group: Option<String>, // Media group already acknowledged
    },
    AwaitingConfirmation {
        photos: Vec<String>,
        title: Option<String>,
        message_id: Option<i32>, // Message carrying the confirmation keyboard
    },
}

impl SessionState {
    /// Fresh collecting state
    pub fn collecting() -> Self {
        SessionState::AwaitingPhotos {
            photos: Vec::new(),
            title: None,
            last_media_group: None,
        }
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingPhotos { .. } => "awaiting_photos",
            SessionState::AwaitingConfirmation { .. } => "awaiting_confirmation",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// Storage for per-chat session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state for the chat; missing or expired sessions are `Idle`
    async fn get(&self, chat_id: ChatId) -> AppResult<SessionState>;

    /// Replace the chat's state
    async fn update(&self, chat_id: ChatId, state: SessionState) -> AppResult<()>;

    /// Forget the chat's state
    async fn reset(&self, chat_id: ChatId) -> AppResult<()>;
}

/// Process-local session store
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<ChatId, (SessionState, Instant)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored (possibly expired) sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, chat_id: ChatId) -> AppResult<SessionState> {
        let mut sessions = self.sessions.lock();
        match sessions.get(&chat_id) {
            Some((state, touched)) if touched.elapsed() < self.ttl => Ok(state.clone()),
            Some(_) => {
                sessions.remove(&chat_id);
                tracing::debug!(chat_id = %chat_id, "Session expired");
                Ok(SessionState::Idle)
            }
            None => Ok(SessionState::Idle),
        }
    }

    async fn update(&self, chat_id: ChatId, state: SessionState) -> AppResult<()> {
        let mut sessions = self.sessions.lock();
        // Chats that went quiet are never read again, so sweep them here
        let ttl = self.ttl;
        sessions.retain(|_, (_, touched)| touched.elapsed() < ttl);

        if state.is_idle() {
            sessions.remove(&chat_id);
        } else {
            sessions.insert(chat_id, (state, Instant::now()));
        }
        Ok(())
    }

    async fn reset(&self, chat_id: ChatId) -> AppResult<()> {
        self.sessions.lock().remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_session_is_idle() {
        let store = MemorySessionStore::default();
        assert_eq!(store.get(ChatId(1)).await.unwrap(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_update_and_reset() {
        let store = MemorySessionStore::default();
        let state = SessionState::AwaitingPhotos {
            photos: vec!["file-a".to_string()],
            title: Some("Beach".to_string()),
            last_media_group: None,
        };

        store.update(ChatId(7), state.clone()).await.unwrap();
        assert_eq!(store.get(ChatId(7)).await.unwrap(), state);
        // Other chats are unaffected
        assert!(store.get(ChatId(8)).await.unwrap().is_idle());

        store.reset(ChatId(7)).await.unwrap();
        assert!(store.get(ChatId(7)).await.unwrap().is_idle());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_idle_update_removes_entry() {
        let store = MemorySessionStore::default();
        store
            .update(ChatId(3), SessionState::collecting())
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        store.update(ChatId(3), SessionState::Idle).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_idle() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        store
            .update(ChatId(9), SessionState::collecting())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get(ChatId(9)).await.unwrap().is_idle());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_sessions_are_swept_on_update() {
        let store = MemorySessionStore::new(Duration::from_millis(200));
        for chat in 0..100 {
            store
                .update(ChatId(chat), SessionState::collecting())
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 100);

        tokio::time::sleep(Duration::from_millis(300)).await;
        store
            .update(ChatId(99_999), SessionState::collecting())
            .await
            .unwrap();

        // None of the first hundred chats came back, yet their entries are gone
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(ChatId(99_999)).await.unwrap(), SessionState::collecting());
    }

    #[test]
    fn test_state_serializes_for_persistent_stores() {
        let state = SessionState::AwaitingConfirmation {
            photos: vec!["a".to_string(), "b".to_string()],
            title: None,
            message_id: Some(12),
        };
        let json = serde_json::to_string(&state).unwrap();
        let restored: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.label(), "awaiting_confirmation");
    }
}
