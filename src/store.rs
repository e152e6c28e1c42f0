//! User and album persistence seam.
//!
//! [`BotStore`] is implemented by [`MemoryStore`] (used when no database is
//! configured and in tests) and by [`crate::db::PgStore`].

use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Represents a user in the database
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub language_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved album (without its photos)
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: i64,
    pub telegram_id: i64,
    pub title: String,
    pub photo_count: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BotStore: Send + Sync {
    /// Get or create a user by Telegram ID
    async fn upsert_user(&self, telegram_id: i64, language_code: Option<&str>) -> AppResult<User>;

    /// Persist an album and its ordered photos, returning the album id
    async fn create_album(&self, telegram_id: i64, title: &str, photos: &[String])
        -> AppResult<i64>;

    /// Albums owned by the user, newest first
    async fn list_albums(&self, telegram_id: i64, limit: i64, offset: i64)
        -> AppResult<Vec<Album>>;

    async fn count_albums(&self, telegram_id: i64) -> AppResult<i64>;

    /// Album and its photo ids, only when owned by `telegram_id`
    async fn get_album(
        &self,
        telegram_id: i64,
        album_id: i64,
    ) -> AppResult<Option<(Album, Vec<String>)>>;

    /// Delete an owned album; false when nothing matched
    async fn delete_album(&self, telegram_id: i64, album_id: i64) -> AppResult<bool>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    next_user_id: i64,
    next_album_id: i64,
    users: HashMap<i64, User>,
    albums: Vec<(Album, Vec<String>)>,
}

/// Process-local store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BotStore for MemoryStore {
    async fn upsert_user(&self, telegram_id: i64, language_code: Option<&str>) -> AppResult<User> {
        let mut state = self.state.lock();
        if let Some(user) = state.users.get(&telegram_id) {
            return Ok(user.clone());
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.next_user_id,
            telegram_id,
            language_code: language_code.unwrap_or("en").to_string(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(telegram_id, user.clone());
        Ok(user)
    }

    async fn create_album(
        &self,
        telegram_id: i64,
        title: &str,
        photos: &[String],
    ) -> AppResult<i64> {
        let mut state = self.state.lock();
        state.next_album_id += 1;
        let album = Album {
            id: state.next_album_id,
            telegram_id,
            title: title.to_string(),
            photo_count: photos.len() as i64,
            created_at: Utc::now(),
        };
        let id = album.id;
        state.albums.push((album, photos.to_vec()));
        Ok(id)
    }

    async fn list_albums(
        &self,
        telegram_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Album>> {
        let state = self.state.lock();
        // Ids grow monotonically, so reverse insertion order is newest first
        Ok(state
            .albums
            .iter()
            .rev()
            .filter(|(album, _)| album.telegram_id == telegram_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(album, _)| album.clone())
            .collect())
    }

    async fn count_albums(&self, telegram_id: i64) -> AppResult<i64> {
        let state = self.state.lock();
        Ok(state
            .albums
            .iter()
            .filter(|(album, _)| album.telegram_id == telegram_id)
            .count() as i64)
    }

    async fn get_album(
        &self,
        telegram_id: i64,
        album_id: i64,
    ) -> AppResult<Option<(Album, Vec<String>)>> {
        let state = self.state.lock();
        Ok(state
            .albums
            .iter()
            .find(|(album, _)| album.id == album_id && album.telegram_id == telegram_id)
            .cloned())
    }

    async fn delete_album(&self, telegram_id: i64, album_id: i64) -> AppResult<bool> {
        let mut state = self.state.lock();
        let before = state.albums.len();
        state
            .albums
            .retain(|(album, _)| !(album.id == album_id && album.telegram_id == telegram_id));
        Ok(state.albums.len() != before)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
