//! Ingress adapters.
//!
//! Both adapters push raw Telegram updates into one bounded queue that the
//! dispatcher worker drains in arrival order.

pub mod polling;
pub mod webhook;

use teloxide::types::{AllowedUpdate, Update};
use tokio::sync::mpsc;

pub type UpdateSender = mpsc::Sender<Update>;
pub type UpdateReceiver = mpsc::Receiver<Update>;

/// Update kinds requested from Telegram; everything else is never delivered
pub fn allowed_updates() -> Vec<AllowedUpdate> {
    vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]
}

/// Create the queue between ingress and dispatcher
pub fn update_channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    mpsc::channel(capacity.max(1))
}
