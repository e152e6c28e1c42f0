//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics collection and Prometheus export
//! - Liveness and readiness endpoints for monitoring

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hyper::server::conn::http1;
use hyper::{Method, Response, StatusCode};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;

use crate::config::validate_bot_token;
use crate::observability_config::ObservabilityConfig;
use crate::store::BotStore;

/// Dependencies probed by `/health/ready`
#[derive(Clone)]
pub struct ReadinessChecks {
    pub store: Arc<dyn BotStore>,
    pub bot_token: String,
}

impl ReadinessChecks {
    pub fn new(store: Arc<dyn BotStore>, bot_token: impl Into<String>) -> Self {
        Self {
            store,
            bot_token: bot_token.into(),
        }
    }
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("photo_album_bot={}", config.log_level).parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("teloxide=warn".parse()?);

    // Pretty for development, JSON for others
    if config.use_pretty_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    tracing::info!(
        metrics_enabled = %config.enable_metrics_export,
        "Metrics collection initialized"
    );
    Ok(handle)
}

/// Serve `/metrics` and the health probes until `cancel` fires
pub async fn start_metrics_server(
    metrics_handle: PrometheusHandle,
    port: u16,
    checks: ReadinessChecks,
    cancel: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    Ok(tokio::spawn(async move {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, _)) => {
                    let metrics_handle = metrics_handle.clone();
                    let checks = checks.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let checks = checks.clone();
                                async move {
                                    Ok::<_, Infallible>(
                                        handle_request(
                                            req.method(),
                                            req.uri().path(),
                                            &metrics_handle,
                                            &checks,
                                        )
                                        .await,
                                    )
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                }
            }
        }
        tracing::info!("Metrics server stopped");
    }))
}

/// Route one request of the metrics server
pub async fn handle_request(
    method: &Method,
    path: &str,
    metrics_handle: &PrometheusHandle,
    checks: &ReadinessChecks,
) -> Response<String> {
    match (method, path) {
        (&Method::GET, "/metrics") => {
            let mut response = Response::new(metrics_handle.render());
            response.headers_mut().insert(
                "content-type",
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            response
        }
        // Liveness probe - the process answers
        (&Method::GET, "/health/live") => Response::new("OK".to_string()),
        (&Method::GET, "/health/ready") => match perform_readiness_checks(checks).await {
            Ok(()) => Response::new("OK".to_string()),
            Err(e) => {
                let mut response = Response::new(format!("NOT READY: {}", e));
                *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                response
            }
        },
        _ => {
            let mut response = Response::new("Not Found".to_string());
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    }
}

/// Perform readiness checks
pub async fn perform_readiness_checks(checks: &ReadinessChecks) -> Result<()> {
    checks
        .store
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("Store health check failed: {}", e))?;

    validate_bot_token(&checks.bot_token)
        .map_err(|e| anyhow::anyhow!("Bot token health check failed: {}", e))?;

    tracing::debug!("Readiness checks passed");
    Ok(())
}

/// Create a span for database operations
pub fn db_span(operation: &str) -> tracing::Span {
    tracing::info_span!("db_operation", operation = operation, component = "database")
}

/// Create a span for Telegram bot operations
pub fn telegram_span(operation: &str, user_id: Option<i64>) -> tracing::Span {
    tracing::info_span!(
        "telegram_operation",
        operation = operation,
        user_id = user_id,
        component = "telegram"
    )
}

/// Count an update accepted by an ingress
pub fn record_update_received(source: &'static str) {
    metrics::counter!("telegram_updates_total", "source" => source).increment(1);
}

/// Count a redelivered update that was dropped
pub fn record_duplicate_update(source: &'static str) {
    metrics::counter!("telegram_duplicate_updates_total", "source" => source).increment(1);
}

/// Count an update the ingress could not enqueue
pub fn record_update_rejected(source: &'static str, reason: &'static str) {
    metrics::counter!("telegram_updates_rejected_total", "source" => source, "reason" => reason)
        .increment(1);
}

/// Record handler outcome and latency per route
pub fn record_handler_metrics(route: &'static str, success: bool, duration: Duration) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("handler_invocations_total", "route" => route, "result" => result)
        .increment(1);
    metrics::histogram!("handler_duration_seconds", "route" => route)
        .record(duration.as_secs_f64());
}

/// Record an outbound Bot API call
pub fn record_outbound_call(method: &'static str, success: bool, attempts: u32) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("telegram_api_calls_total", "method" => method, "result" => result)
        .increment(1);
    if attempts > 1 {
        metrics::counter!("telegram_api_retries_total", "method" => method)
            .increment(u64::from(attempts - 1));
    }
}

/// Record database operation metrics
pub fn record_db_metrics(operation: &str, duration: Duration) {
    let operation = operation.to_string();
    metrics::counter!("db_operations_total", "operation" => operation).increment(1);
    metrics::histogram!("db_operation_duration_seconds").record(duration.as_secs_f64());
}
