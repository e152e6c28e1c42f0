use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::{Duration, Instant};
use teloxide::types::ChatId;
use tracing::{debug, info, Instrument};

use crate::config::DatabaseConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::session::{SessionState, SessionStore};
use crate::store::{Album, BotStore, User};

/// Create a connection pool from validated configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Initializing database connection"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .context("Failed to connect to database")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    // Create users table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            language_code VARCHAR(10) DEFAULT 'en',
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    // Create albums table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS albums (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL,
            title VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create albums table")?;

    // Create album photos table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS album_photos (
            album_id BIGINT NOT NULL REFERENCES albums(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            file_id TEXT NOT NULL,
            PRIMARY KEY (album_id, position)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create album_photos table")?;

    // Create sessions table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            chat_id BIGINT PRIMARY KEY,
            state TEXT NOT NULL,
            updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create sessions table")?;

    // Create indexes for performance
    sqlx::query("CREATE INDEX IF NOT EXISTS albums_telegram_id_idx ON albums(telegram_id, created_at DESC)")
        .execute(pool)
        .await
        .context("Failed to create albums telegram_id index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS sessions_updated_at_idx ON sessions(updated_at)")
        .execute(pool)
        .await
        .context("Failed to create sessions updated_at index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get(0),
        telegram_id: row.get(1),
        language_code: row.get(2),
        created_at: row.get(3),
        updated_at: row.get(4),
    }
}

fn album_from_row(row: &PgRow) -> Album {
    Album {
        id: row.get(0),
        telegram_id: row.get(1),
        title: row.get(2),
        created_at: row.get(3),
        photo_count: row.get(4),
    }
}

/// Get or create a user by Telegram ID
pub async fn get_or_create_user(
    pool: &PgPool,
    telegram_id: i64,
    language_code: Option<&str>,
) -> Result<User> {
    debug!(telegram_id = %telegram_id, "Getting or creating user");

    // Try to get existing user
    if let Some(user) = get_user_by_telegram_id(pool, telegram_id).await? {
        return Ok(user);
    }

    // Create new user; a concurrent insert for the same id falls through to the SELECT
    let language_code = language_code.unwrap_or("en");
    sqlx::query(
        "INSERT INTO users (telegram_id, language_code) VALUES ($1, $2) ON CONFLICT (telegram_id) DO NOTHING",
    )
    .bind(telegram_id)
    .bind(language_code)
    .execute(pool)
    .await
    .context("Failed to create new user")?;

    let user = get_user_by_telegram_id(pool, telegram_id)
        .await?
        .context("User missing right after insert")?;

    debug!(user_id = %user.id, "User created successfully");
    Ok(user)
}

/// Get a user by Telegram ID
pub async fn get_user_by_telegram_id(pool: &PgPool, telegram_id: i64) -> Result<Option<User>> {
    debug!(telegram_id = %telegram_id, "Getting user by telegram_id");

    let row = sqlx::query("SELECT id, telegram_id, language_code, created_at, updated_at FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by telegram_id")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Create an album with its photos in one transaction
pub async fn create_album(
    pool: &PgPool,
    telegram_id: i64,
    title: &str,
    photos: &[String],
) -> Result<i64> {
    debug!(telegram_id = %telegram_id, photos = photos.len(), "Creating new album");

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query("INSERT INTO albums (telegram_id, title) VALUES ($1, $2) RETURNING id")
        .bind(telegram_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert new album")?;
    let album_id: i64 = row.get(0);

    for (position, file_id) in photos.iter().enumerate() {
        sqlx::query("INSERT INTO album_photos (album_id, position, file_id) VALUES ($1, $2, $3)")
            .bind(album_id)
            .bind(position as i32)
            .bind(file_id)
            .execute(&mut *tx)
            .await
            .context("Failed to insert album photo")?;
    }

    tx.commit().await.context("Failed to commit album")?;

    debug!(album_id = %album_id, "Album created successfully");
    Ok(album_id)
}

/// List a user's albums, newest first
pub async fn list_albums(
    pool: &PgPool,
    telegram_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Album>> {
    debug!(telegram_id = %telegram_id, limit, offset, "Listing albums");

    let rows = sqlx::query(
        "SELECT a.id, a.telegram_id, a.title, a.created_at, COUNT(p.album_id) AS photo_count
         FROM albums a LEFT JOIN album_photos p ON p.album_id = a.id
         WHERE a.telegram_id = $1
         GROUP BY a.id
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(telegram_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list albums")?;

    Ok(rows.iter().map(album_from_row).collect())
}

/// Count a user's albums
pub async fn count_albums(pool: &PgPool, telegram_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM albums WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_one(pool)
        .await
        .context("Failed to count albums")?;
    Ok(row.get(0))
}

/// Read one album owned by `telegram_id`
pub async fn read_album(pool: &PgPool, telegram_id: i64, album_id: i64) -> Result<Option<Album>> {
    debug!(album_id = %album_id, "Reading album");

    let row = sqlx::query(
        "SELECT a.id, a.telegram_id, a.title, a.created_at, COUNT(p.album_id) AS photo_count
         FROM albums a LEFT JOIN album_photos p ON p.album_id = a.id
         WHERE a.id = $1 AND a.telegram_id = $2
         GROUP BY a.id",
    )
    .bind(album_id)
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read album")?;

    Ok(row.as_ref().map(album_from_row))
}

/// Photo file ids of an album in their original order
pub async fn read_album_photos(pool: &PgPool, album_id: i64) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT file_id FROM album_photos WHERE album_id = $1 ORDER BY position")
        .bind(album_id)
        .fetch_all(pool)
        .await
        .context("Failed to read album photos")?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Delete an album owned by `telegram_id`; photos cascade
pub async fn delete_album(pool: &PgPool, telegram_id: i64, album_id: i64) -> Result<bool> {
    debug!(album_id = %album_id, "Deleting album");

    let result = sqlx::query("DELETE FROM albums WHERE id = $1 AND telegram_id = $2")
        .bind(album_id)
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("Failed to delete album")?;

    let deleted = result.rows_affected() > 0;
    if !deleted {
        info!("No album found with ID: {album_id}");
    }
    Ok(deleted)
}

/// Load the serialized session of a chat if it was touched within `ttl`
pub async fn load_session(pool: &PgPool, chat_id: i64, ttl: Duration) -> Result<Option<String>> {
    let row = sqlx::query(
        "SELECT state FROM sessions WHERE chat_id = $1 AND updated_at > NOW() - make_interval(secs => $2)",
    )
    .bind(chat_id)
    .bind(ttl.as_secs_f64())
    .fetch_optional(pool)
    .await
    .context("Failed to load session")?;

    Ok(row.map(|row| row.get(0)))
}

/// Insert or replace the serialized session of a chat
pub async fn save_session(pool: &PgPool, chat_id: i64, state: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO sessions (chat_id, state, updated_at) VALUES ($1, $2, CURRENT_TIMESTAMP)
         ON CONFLICT (chat_id) DO UPDATE SET state = EXCLUDED.state, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(chat_id)
    .bind(state)
    .execute(pool)
    .await
    .context("Failed to save session")?;
    Ok(())
}

/// Delete every session not touched within `ttl`, returning how many went
pub async fn delete_expired_sessions(pool: &PgPool, ttl: Duration) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM sessions WHERE updated_at <= NOW() - make_interval(secs => $1)",
    )
    .bind(ttl.as_secs_f64())
    .execute(pool)
    .await
    .context("Failed to delete expired sessions")?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(deleted, "Expired sessions removed");
    }
    Ok(deleted)
}

/// Remove a chat's session
pub async fn delete_session(pool: &PgPool, chat_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

/// PostgreSQL-backed implementation of both storage seams
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    session_ttl: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }
}

/// Time a database call, record metrics and map failures to [`AppError::Database`]
async fn timed<T, F>(operation: &str, telegram_id: Option<i64>, fut: F) -> AppResult<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = fut.instrument(observability::db_span(operation)).await;
    observability::record_db_metrics(operation, start.elapsed());
    result.map_err(|e| {
        error_logging::log_database_error(&format!("{e:#}"), operation, telegram_id);
        AppError::Database(format!("{e:#}"))
    })
}

#[async_trait]
impl BotStore for PgStore {
    async fn upsert_user(&self, telegram_id: i64, language_code: Option<&str>) -> AppResult<User> {
        timed(
            "upsert_user",
            Some(telegram_id),
            get_or_create_user(&self.pool, telegram_id, language_code),
        )
        .await
    }

    async fn create_album(
        &self,
        telegram_id: i64,
        title: &str,
        photos: &[String],
    ) -> AppResult<i64> {
        timed(
            "create_album",
            Some(telegram_id),
            create_album(&self.pool, telegram_id, title, photos),
        )
        .await
    }

    async fn list_albums(
        &self,
        telegram_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Album>> {
        timed(
            "list_albums",
            Some(telegram_id),
            list_albums(&self.pool, telegram_id, limit, offset),
        )
        .await
    }

    async fn count_albums(&self, telegram_id: i64) -> AppResult<i64> {
        timed(
            "count_albums",
            Some(telegram_id),
            count_albums(&self.pool, telegram_id),
        )
        .await
    }

    async fn get_album(
        &self,
        telegram_id: i64,
        album_id: i64,
    ) -> AppResult<Option<(Album, Vec<String>)>> {
        timed("get_album", Some(telegram_id), async {
            match read_album(&self.pool, telegram_id, album_id).await? {
                Some(album) => {
                    let photos = read_album_photos(&self.pool, album.id).await?;
                    Ok(Some((album, photos)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn delete_album(&self, telegram_id: i64, album_id: i64) -> AppResult<bool> {
        timed(
            "delete_album",
            Some(telegram_id),
            delete_album(&self.pool, telegram_id, album_id),
        )
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        timed("ping", None, async {
            sqlx::query("SELECT 1")
                .fetch_one(&self.pool)
                .await
                .context("Database health check failed")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn get(&self, chat_id: ChatId) -> AppResult<SessionState> {
        let raw = timed(
            "load_session",
            None,
            load_session(&self.pool, chat_id.0, self.session_ttl),
        )
        .await?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(state) => Ok(state),
                Err(e) => {
                    // Unreadable state (e.g. written by an older build) restarts the conversation
                    tracing::warn!(chat_id = %chat_id, error = %e, "Discarding unreadable session");
                    Ok(SessionState::Idle)
                }
            },
            None => Ok(SessionState::Idle),
        }
    }

    async fn update(&self, chat_id: ChatId, state: SessionState) -> AppResult<()> {
        if state.is_idle() {
            return self.reset(chat_id).await;
        }
        let raw = serde_json::to_string(&state)?;
        timed("save_session", None, save_session(&self.pool, chat_id.0, &raw)).await?;

        // Abandoned conversations never come back to be reset
        timed(
            "delete_expired_sessions",
            None,
            delete_expired_sessions(&self.pool, self.session_ttl),
        )
        .await
        .map(|_| ())
    }

    async fn reset(&self, chat_id: ChatId) -> AppResult<()> {
        timed("delete_session", None, delete_session(&self.pool, chat_id.0)).await
    }
}
