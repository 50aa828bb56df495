//! Service wiring: Telegram channel, dispatcher, and the HTTP listener
//! (health endpoint + Telegram webhook) on a single port.
//!
//! Inbound mode follows config: when `channels.telegram.webhookUrl` is set the
//! webhook is registered and Telegram POSTs updates to us; otherwise the
//! getUpdates long-poll loop runs. Both feed the same mpsc channel consumed by
//! one dispatcher task.

use crate::channels::{classify_update, InboundEvent, TelegramChannel, TelegramUpdate};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::media::{MediaPipeline, MediaStore};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
struct ServiceState {
    inbound_tx: mpsc::Sender<InboundEvent>,
    webhook_secret: Option<String>,
    port: u16,
}

/// Run the bot until SIGINT/SIGTERM: start the channel, the dispatcher, and
/// the HTTP listener; on shutdown stop the channel, remove the webhook if one
/// was set, and await the long-poll task.
pub async fn run_service(config: Config, config_path: impl AsRef<Path>) -> Result<()> {
    let token = config::resolve_telegram_token(&config).context(
        "telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)",
    )?;
    let storage_dir = config::resolve_storage_dir(&config, config_path.as_ref());
    std::fs::create_dir_all(&storage_dir)
        .with_context(|| format!("creating storage directory {}", storage_dir.display()))?;
    log::info!("storing photos in {}", storage_dir.display());

    let telegram = Arc::new(TelegramChannel::new(
        token,
        config::resolve_api_base(&config),
    ));
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(32);

    let pipeline = MediaPipeline::new(telegram.clone(), MediaStore::new(storage_dir));
    let dispatcher = Dispatcher::new(telegram.clone(), pipeline, config.replies.clone());
    tokio::spawn(dispatcher.run(inbound_rx));

    let mut poll_task: Option<JoinHandle<()>> = None;
    let webhook_registered = if let Some(ref url) = config.channels.telegram.webhook_url {
        let secret = config.channels.telegram.webhook_secret.as_deref();
        if let Err(e) = telegram.set_webhook(url, secret).await {
            log::warn!("telegram set_webhook failed: {}", e);
        } else {
            log::info!("telegram channel registered (webhook mode): {}", url);
        }
        true
    } else {
        poll_task = Some(telegram.clone().start_inbound(inbound_tx.clone()));
        log::info!("telegram channel registered, getUpdates loop started");
        false
    };

    let state = ServiceState {
        inbound_tx,
        webhook_secret: config.channels.telegram.webhook_secret.clone(),
        port: config.server.port,
    };
    let app = Router::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(telegram, poll_task, webhook_registered))
        .await
        .context("service exited")?;
    log::info!("service stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the channel, removes the Telegram webhook if used, then awaits the poll task.
async fn shutdown_signal(
    telegram: Arc<TelegramChannel>,
    poll_task: Option<JoinHandle<()>>,
    webhook_registered: bool,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping telegram channel");

    telegram.stop();
    if webhook_registered {
        if let Err(e) = telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }
    if let Some(handle) = poll_task {
        let _ = handle.await;
    }
    log::info!("channel tasks finished");
}

/// POST /telegram/webhook — verifies the optional secret, classifies the
/// update, and pushes the event to the dispatcher.
async fn telegram_webhook(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let Some(event) = classify_update(&update) else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(event).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<ServiceState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
