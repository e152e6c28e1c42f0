//! # Application Error Types
//!
//! This module defines common error types used throughout the bot.
//! It provides structured error handling for ingress, dispatching, storage
//! and outbound Telegram calls.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (album titles, user input, etc.)
    Validation(String),
    /// Database operation errors
    Database(String),
    /// Telegram Bot API errors
    Telegram(String),
    /// Session store errors
    Session(String),
    /// Webhook / polling ingress errors
    Ingress(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Database(msg) => write!(f, "[DATABASE] {}", msg),
            AppError::Telegram(msg) => write!(f, "[TELEGRAM] {}", msg),
            AppError::Session(msg) => write!(f, "[SESSION] {}", msg),
            AppError::Ingress(msg) => write!(f, "[INGRESS] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Telegram(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::{error, warn};

    /// Log database operation errors with contextual information
    pub fn log_database_error(
        error: &impl std::fmt::Display,
        operation: &str,
        telegram_id: Option<i64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            telegram_id = ?telegram_id,
            "Database operation failed"
        );
    }

    /// Log Telegram Bot API errors with the call that failed
    pub fn log_telegram_error(
        error: &impl std::fmt::Display,
        method: &str,
        chat_id: Option<i64>,
        attempt: Option<u32>,
    ) {
        error!(
            error = %error,
            method = %method,
            chat_id = ?chat_id,
            attempt = ?attempt,
            "Telegram API call failed"
        );
    }

    /// Log a handler failure for a single inbound event
    pub fn log_handler_error(
        error: &impl std::fmt::Display,
        route: &str,
        chat_id: i64,
        user_id: Option<i64>,
    ) {
        error!(
            error = %error,
            route = %route,
            chat_id = %chat_id,
            user_id = ?user_id,
            "Update handler failed"
        );
    }

    /// Log ingress problems (webhook payloads, polling requests)
    pub fn log_ingress_error(
        error: &impl std::fmt::Display,
        source: &str,
        update_id: Option<i64>,
    ) {
        warn!(
            error = %error,
            source = %source,
            update_id = ?update_id,
            "Ingress could not accept update"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        chat_id: Option<i64>,
        input_value: Option<&str>,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            chat_id = ?chat_id,
            input_value = ?input_value.map(|v| v.chars().take(100).collect::<String>()),
            "Validation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
