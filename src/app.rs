//! Runtime glue between the update queue and the dispatcher

use teloxide::types::Update;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

use crate::bot::{dispatch, BotContext};
use crate::errors::error_logging;
use crate::events::InboundEvent;
use crate::ingress::UpdateReceiver;
use crate::observability;

/// Handle one update; failures are logged, the update counts as handled either way
pub async fn process_update(ctx: &BotContext, update: Update) {
    let Some(event) = InboundEvent::from_update(&update) else {
        debug!(update_id = update.id.0, "Ignoring unsupported update");
        return;
    };

    let span = observability::telegram_span(event.kind_label(), event.user_id());
    async {
        if let Err(e) = dispatch(ctx, &event).await {
            error_logging::log_handler_error(
                &e,
                event.kind_label(),
                event.chat_id.0,
                event.user_id(),
            );
        }
    }
    .instrument(span)
    .await
}

/// Drain the queue one update at a time until it closes or `cancel` fires
pub async fn run_dispatcher(ctx: BotContext, mut rx: UpdateReceiver, cancel: CancellationToken) {
    info!("Dispatcher started");
    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => break,
            update = rx.recv() => update,
        };
        match update {
            Some(update) => process_update(&ctx, update).await,
            None => break,
        }
    }
    info!("Dispatcher stopped");
}
