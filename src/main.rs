use anyhow::{Context, Result};
use photo_album_bot::app;
use photo_album_bot::bot::{BotContext, BotSettings};
use photo_album_bot::config::{AppConfig, IngressMode};
use photo_album_bot::db::{self, PgStore};
use photo_album_bot::deduplication::create_shared_deduplicator;
use photo_album_bot::errors::error_logging;
use photo_album_bot::ingress::{self, polling, webhook};
use photo_album_bot::localization;
use photo_album_bot::observability::{self, ReadinessChecks};
use photo_album_bot::outbound::TelegramApi;
use photo_album_bot::session::{MemorySessionStore, SessionStore};
use photo_album_bot::store::{BotStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Entries kept by the webhook deduplicator
const DEDUP_MAX_ENTRIES: usize = 10_000;

/// Headroom between the long-poll timeout and the HTTP client timeout
const POLLING_TIMEOUT_HEADROOM_SECS: u64 = 10;

/// Pick the PostgreSQL store when configured, in-memory storage otherwise
async fn init_storage(config: &AppConfig) -> Result<(Arc<dyn BotStore>, Arc<dyn SessionStore>)> {
    let session_ttl = Duration::from_secs(config.session.ttl_secs);

    match &config.database {
        Some(database) => {
            let pool = db::connect(database).await?;
            db::init_database_schema(&pool).await?;
            let store = Arc::new(PgStore::new(pool, session_ttl));
            let bot_store: Arc<dyn BotStore> = store.clone();
            let session_store: Arc<dyn SessionStore> = store;
            Ok((bot_store, session_store))
        }
        None => {
            warn!("DATABASE_URL not set, albums and sessions are kept in memory and lost on restart");
            let bot_store: Arc<dyn BotStore> = Arc::new(MemoryStore::new());
            let session_store: Arc<dyn SessionStore> =
                Arc::new(MemorySessionStore::new(session_ttl));
            Ok((bot_store, session_store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::init_tracing(&config.observability)?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "environment", "startup_validation");
        return Err(e.into());
    }
    info!("{}", config.summary());

    let cancel = CancellationToken::new();
    let (store, sessions) = init_storage(&config).await?;

    let metrics_server = if config.observability.enable_metrics_export {
        let handle = observability::init_metrics(&config.observability)?;
        Some(
            observability::start_metrics_server(
                handle,
                config.server.metrics_port,
                ReadinessChecks::new(store.clone(), config.bot.token.clone()),
                cancel.clone(),
            )
            .await?,
        )
    } else {
        None
    };

    let localization_manager = localization::create_localization_manager()?;

    // Long polling holds the request open, so the client must outlast it
    let mut timeout_secs = config.bot.http_timeout_secs;
    if config.ingress.mode == IngressMode::Polling {
        timeout_secs = timeout_secs
            .max(u64::from(config.ingress.polling_timeout_secs) + POLLING_TIMEOUT_HEADROOM_SECS);
    }
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;
    let bot = Bot::with_client(config.bot.token.clone(), client);
    info!(timeout_secs, "Bot client initialized");

    let ctx = BotContext {
        api: Arc::new(TelegramApi::new(bot.clone())),
        sessions,
        store,
        localization: localization_manager,
        settings: BotSettings::from(&config.bot),
    };

    let (tx, rx) = ingress::update_channel(config.ingress.update_queue_capacity);
    let dispatcher = tokio::spawn(app::run_dispatcher(ctx, rx, cancel.clone()));

    let ingress_task = match config.ingress.mode {
        IngressMode::Webhook => {
            let secret = config.ingress.webhook_secret_token.as_deref();
            let dedup = create_shared_deduplicator(
                config.ingress.deduplication_ttl_secs,
                DEDUP_MAX_ENTRIES,
            );
            let router = webhook::router(
                &config.ingress.webhook_path,
                webhook::WebhookState::new(tx, dedup, secret),
            );
            let listener = TcpListener::bind(&config.ingress.webhook_listen_addr)
                .await
                .with_context(|| {
                    format!("Failed to bind {}", config.ingress.webhook_listen_addr)
                })?;

            let url = config
                .ingress
                .webhook_url
                .as_deref()
                .context("WEBHOOK_URL is required in webhook mode")?;
            webhook::register_webhook(&bot, url, secret).await?;

            tokio::spawn(webhook::serve(listener, router, cancel.clone()))
        }
        IngressMode::Polling => tokio::spawn(polling::run_polling(
            bot.clone(),
            tx,
            polling::PollingOptions {
                timeout_secs: config.ingress.polling_timeout_secs,
            },
            cancel.clone(),
        )),
    };

    info!(mode = ?config.ingress.mode, "Bot is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down gracefully...");
    cancel.cancel();

    if config.ingress.mode == IngressMode::Webhook {
        if let Err(e) = webhook::unregister_webhook(&bot).await {
            error_logging::log_telegram_error(&e, "deleteWebhook", None, None);
        }
    }

    match ingress_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error_logging::log_ingress_error(&e, "shutdown", None),
        Err(e) => warn!(error = %e, "Ingress task panicked"),
    }
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "Dispatcher task panicked");
    }
    if let Some(server) = metrics_server {
        if let Err(e) = server.await {
            warn!(error = %e, "Metrics server task panicked");
        }
    }

    info!("Bot stopped");
    Ok(())
}
