//! Inbound event from the channel: one classified unit of input, consumed
//! entirely within a single dispatch cycle.

/// A classified Telegram update. Exactly one variant matches per update;
/// commands win over photos, photos win over plain text.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A bot command, e.g. "/start" (keyword without the slash or bot mention).
    Command { name: String, chat_id: i64 },
    /// A message carrying a photo; `file_id` references the best-quality size.
    Photo { file_id: String, chat_id: i64 },
    /// Any other message (plain text, stickers, etc.).
    Text { chat_id: i64 },
}
