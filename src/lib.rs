//! # Photo Album Telegram Bot
//!
//! A Telegram bot that collects photos sent in a chat into named albums,
//! lets the user preview and save them, and resends saved albums as media
//! groups. Updates arrive through a webhook or long polling.

pub mod app;
pub mod bot;
pub mod config;
pub mod db;
pub mod deduplication;
pub mod errors;
pub mod events;
pub mod ingress;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod outbound;
pub mod session;
pub mod store;
pub mod validation;

// Re-export types for easier access
pub use bot::{BotContext, BotSettings};
pub use errors::{AppError, AppResult};
pub use events::{EventKind, InboundEvent};
