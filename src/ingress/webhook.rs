//! Webhook ingress: Telegram POSTs each update to our HTTPS endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use teloxide::prelude::*;
use teloxide::types::Update;
use tokio::net::TcpListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::{allowed_updates, UpdateSender};
use crate::config::DEFAULT_WEBHOOK_PATH;
use crate::deduplication::SharedDeduplicator;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

const SOURCE: &str = "webhook";

/// Shared state of the webhook route
#[derive(Clone)]
pub struct WebhookState {
    pub tx: UpdateSender,
    pub dedup: SharedDeduplicator,
    pub secret_token: Option<Arc<str>>,
}

impl WebhookState {
    pub fn new(tx: UpdateSender, dedup: SharedDeduplicator, secret_token: Option<&str>) -> Self {
        Self {
            tx,
            dedup,
            secret_token: secret_token.map(Arc::from),
        }
    }
}

/// `""` becomes the default path; a leading `/` is added when missing
pub fn normalize_webhook_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        DEFAULT_WEBHOOK_PATH.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Router with a single `POST` route at `path`
pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(&normalize_webhook_path(path), post(webhook_handler))
        .with_state(state)
}

fn secret_matches(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

async fn webhook_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !secret_matches(&headers, state.secret_token.as_deref()) {
        tracing::warn!("Rejected webhook call with invalid secret token");
        return StatusCode::UNAUTHORIZED;
    }

    // Malformed payloads are acknowledged; Telegram would redeliver them forever
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            error_logging::log_ingress_error(&e, SOURCE, None);
            return StatusCode::OK;
        }
    };
    let update_id = value.get("update_id").and_then(serde_json::Value::as_i64);
    let update: Update = match serde_json::from_value(value) {
        Ok(update) => update,
        Err(e) => {
            error_logging::log_ingress_error(&e, SOURCE, update_id);
            return StatusCode::OK;
        }
    };

    if let Some(update_id) = update_id {
        if state.dedup.is_duplicate(update_id) {
            tracing::debug!(update_id, "Skipping duplicate update");
            observability::record_duplicate_update(SOURCE);
            return StatusCode::OK;
        }
    }

    match state.tx.try_send(update) {
        Ok(()) => {
            tracing::debug!(update_id = ?update_id, "Webhook update queued");
            observability::record_update_received(SOURCE);
            StatusCode::OK
        }
        Err(err) => {
            let reason = match err {
                TrySendError::Full(_) => "queue_full",
                TrySendError::Closed(_) => "queue_closed",
            };
            error_logging::log_ingress_error(
                &AppError::Ingress(format!("update queue unavailable: {reason}")),
                SOURCE,
                update_id,
            );
            observability::record_update_rejected(SOURCE, reason);
            // Let Telegram's redelivery through
            if let Some(update_id) = update_id {
                state.dedup.forget(update_id);
            }
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Point Telegram at our public URL
pub async fn register_webhook(bot: &Bot, url: &str, secret_token: Option<&str>) -> AppResult<()> {
    let url = url::Url::parse(url)
        .map_err(|e| AppError::Config(format!("Invalid webhook URL: {e}")))?;

    let mut request = bot
        .set_webhook(url.clone())
        .allowed_updates(allowed_updates());
    if let Some(secret) = secret_token {
        request = request.secret_token(secret.to_string());
    }
    request.await?;

    tracing::info!(url = %url, "Webhook registered");
    Ok(())
}

/// Stop Telegram from calling us
pub async fn unregister_webhook(bot: &Bot) -> AppResult<()> {
    bot.delete_webhook().await?;
    tracing::info!("Webhook removed");
    Ok(())
}

/// Serve the router until `cancel` fires
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> AppResult<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Ingress(e.to_string()))?;
    tracing::info!(%addr, "Webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| AppError::Ingress(format!("Webhook server failed: {e}")))?;

    tracing::info!("Webhook server stopped");
    Ok(())
}
