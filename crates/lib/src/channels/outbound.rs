//! Outbound reply seam: the dispatcher acknowledges every event through this trait.

use async_trait::async_trait;

/// Sends a reply text to a chat. Best-effort: callers log failures and move on;
/// no delivery confirmation is tracked.
#[async_trait]
pub trait AckSink: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), String>;
}
