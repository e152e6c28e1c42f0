//! Long-polling ingress via `getUpdates`.

use std::time::Duration;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use super::{allowed_updates, UpdateSender};
use crate::errors::{error_logging, AppResult};
use crate::observability;

const SOURCE: &str = "polling";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct PollingOptions {
    /// Seconds Telegram holds the request open when no update is pending
    pub timeout_secs: u32,
}

/// Backoff after a failed `getUpdates`
pub fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Pull updates until cancelled or the queue closes
pub async fn run_polling(
    bot: Bot,
    tx: UpdateSender,
    options: PollingOptions,
    cancel: CancellationToken,
) -> AppResult<()> {
    // getUpdates is refused while a webhook is set
    bot.delete_webhook().await?;
    tracing::info!(timeout_secs = options.timeout_secs, "Long polling started");

    let mut offset: i32 = 0;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(options.timeout_secs)
            .allowed_updates(allowed_updates());

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = request.send() => result,
        };

        let updates = match result {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                updates
            }
            Err(e) => {
                error_logging::log_ingress_error(&e, SOURCE, None);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = next_backoff(backoff);
                continue;
            }
        };

        for update in updates {
            // Confirmed on the next request, even if handling fails later
            offset = offset.max(update.id.0 as i32 + 1);
            observability::record_update_received(SOURCE);

            if tx.send(update).await.is_err() {
                tracing::warn!("Update queue closed, stopping long polling");
                return Ok(());
            }
        }
    }

    tracing::info!("Long polling stopped");
    Ok(())
}
