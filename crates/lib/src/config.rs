//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.snapvault/config.json`) and
//! environment. Every user-visible reply text lives here too, so nothing the
//! bot sends is baked into the handlers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Health/webhook HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Media storage settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Reply texts sent back to chats.
    #[serde(default)]
    pub replies: Replies,
}

/// HTTP listener bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the health endpoint and Telegram webhook (default 15351).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    15351
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API base URL override (e.g. a local test server). Overridden by TELEGRAM_API_BASE env when set.
    pub api_base: Option<String>,
    /// When set, use webhook mode: Telegram POSTs updates to this URL. If unset, long-poll getUpdates is used.
    pub webhook_url: Option<String>,
    /// Optional secret for webhook verification (X-Telegram-Bot-Api-Secret-Token). Used only when webhook_url is set.
    pub webhook_secret: Option<String>,
}

/// Media storage config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    /// Photo storage root (default: `photos` next to the config file). Relative paths are resolved against the config file's parent.
    pub storage_dir: Option<PathBuf>,
}

/// Reply texts. Defaults are provided; any of them can be overridden in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Replies {
    /// Reply to /start.
    pub welcome: String,
    /// Reply to any other command.
    pub unknown_command: String,
    /// Reply to plain text messages.
    pub send_photo: String,
    /// Reply after a photo was stored.
    pub photo_saved: String,
    /// Reply when the photo could not be stored.
    pub photo_failed: String,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            welcome: "Hi! 👋 Send me a photo and I'll keep it in your vault.".to_string(),
            unknown_command: "Unknown command 😕".to_string(),
            send_photo: "Send me a photo and I'll store it for you!".to_string(),
            photo_saved: "Photo received and saved! ✅".to_string(),
            photo_failed: "Sorry, I couldn't save that photo. 😢".to_string(),
        }
    }
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .channels
                .telegram
                .bot_token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the Bot API base URL override: env TELEGRAM_API_BASE overrides config.
/// None means the standard `https://api.telegram.org` endpoint.
pub fn resolve_api_base(config: &Config) -> Option<String> {
    std::env::var("TELEGRAM_API_BASE")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .channels
                .telegram
                .api_base
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SNAPVAULT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".snapvault").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Resolve the photo storage root: `media.storageDir` if set (relative paths resolved
/// against the config file's parent), otherwise the default `photos` subdirectory.
pub fn resolve_storage_dir(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.media.storage_dir {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent.join(d)
            }
        }
        _ => config_parent.join("photos"),
    }
}

/// Load config from the default path (or SNAPVAULT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the storage directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
