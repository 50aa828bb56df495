//! Telegram channel: long-poll getUpdates, sendMessage, and Bot API file access.
//!
//! Update classification lives here too, so both inbound modes (long poll and
//! webhook) produce the same [`InboundEvent`] stream. Fetch URLs embed the bot
//! token; they are built inside this module and kept out of logs and errors
//! (`reqwest::Error::without_url` everywhere a URL-carrying error could escape).

use crate::channels::inbound::InboundEvent;
use crate::channels::outbound::AckSink;
use crate::media::{ByteStream, FetchError, FileTransport, ResolveError, ResolvedFile};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Photo sizes in ascending quality order (Bot API contract).
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GetFileResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramFile>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
}

/// Classify one update into an [`InboundEvent`].
///
/// Precedence: command > photo > anything else. Updates without a message are
/// dropped (None). A photo message with an empty size list violates the Bot API
/// contract; it is logged and dropped rather than indexed past bounds.
pub fn classify_update(update: &TelegramUpdate) -> Option<InboundEvent> {
    let msg = update.message.as_ref()?;
    let chat_id = msg.chat.id;
    if let Some(name) = msg.text.as_deref().and_then(parse_command) {
        return Some(InboundEvent::Command {
            name: name.to_string(),
            chat_id,
        });
    }
    if let Some(sizes) = msg.photo.as_ref() {
        return match sizes.last() {
            Some(best) => Some(InboundEvent::Photo {
                file_id: best.file_id.clone(),
                chat_id,
            }),
            None => {
                log::warn!(
                    "update {}: photo message with empty size list, dropping",
                    update.update_id
                );
                None
            }
        };
    }
    Some(InboundEvent::Text { chat_id })
}

/// Extract the command keyword from message text: "/start@MyBot args" -> "start".
/// Returns None when the text is not a command (no leading slash, or nothing after it).
fn parse_command(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('/')?;
    let keyword = rest.split(char::is_whitespace).next().unwrap_or("");
    let keyword = keyword.split('@').next().unwrap_or(keyword);
    if keyword.is_empty() {
        None
    } else {
        Some(keyword)
    }
}

/// Telegram channel connector: long-polls for updates, sends replies via
/// sendMessage, and serves as the file transport for the media pipeline.
pub struct TelegramChannel {
    api_base: String,
    token: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// `api_base` of None uses the standard Bot API endpoint.
    pub fn new(token: String, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            api_base,
            token,
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the long-poll loop after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Start the getUpdates long-poll loop and forward classified events.
    /// Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundEvent>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), String> {
        let url = format!(
            "{}/bot{}/getUpdates?timeout={}",
            self.api_base, self.token, LONG_POLL_TIMEOUT
        );
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("getUpdates failed: {} {}", status, body));
        }
        let data: GetUpdatesResponse = res
            .json()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !data.ok {
            return Err("getUpdates returned ok: false".to_string());
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), String> {
        let api_url = format!("{}/bot{}/setWebhook", self.api_base, self.token);
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        let res = self
            .client
            .post(&api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("setWebhook failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), String> {
        let url = format!("{}/bot{}/deleteWebhook", self.api_base, self.token);
        let res = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("deleteWebhook failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Send a text message to a chat via sendMessage API.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("sendMessage failed: {} {}", status, body));
        }
        Ok(())
    }
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<InboundEvent>,
) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next.or(offset);
                for update in updates {
                    let Some(event) = classify_update(&update) else {
                        continue;
                    };
                    if inbound_tx.send(event).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl AckSink for TelegramChannel {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), String> {
        self.send_message(chat_id, text).await
    }
}

#[async_trait]
impl FileTransport for TelegramChannel {
    /// Exchange a file_id for its remote path via getFile.
    async fn resolve(&self, file_id: &str) -> Result<ResolvedFile, ResolveError> {
        let url = format!(
            "{}/bot{}/getFile?file_id={}",
            self.api_base, self.token, file_id
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Request(e.without_url()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ResolveError::Api(format!("getFile failed: {} {}", status, body)));
        }
        let data: GetFileResponse = res
            .json()
            .await
            .map_err(|e| ResolveError::Request(e.without_url()))?;
        if !data.ok {
            return Err(ResolveError::Api(
                data.description
                    .unwrap_or_else(|| "getFile returned ok: false".to_string()),
            ));
        }
        let file = data
            .result
            .ok_or_else(|| ResolveError::Api("getFile returned no result".to_string()))?;
        let remote_path = file
            .file_path
            .ok_or_else(|| ResolveError::Api("getFile result has no file_path".to_string()))?;
        Ok(ResolvedFile {
            remote_path,
            size_bytes: file.file_size,
        })
    }

    /// Stream the bytes behind a resolved remote path.
    async fn fetch(&self, remote_path: &str) -> Result<ByteStream, FetchError> {
        // The URL embeds the bot token; it must not leave this function.
        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, remote_path);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.without_url()))?;
        if !res.status().is_success() {
            return Err(FetchError::Status(res.status().as_u16()));
        }
        Ok(res
            .bytes_stream()
            .map_err(|e| std::io::Error::other(e.without_url()))
            .boxed())
    }
}
