//! Communication channel (Telegram).
//!
//! Inbound updates are classified into events and pushed to the dispatcher;
//! replies go back out through the [`AckSink`] seam.

mod inbound;
mod outbound;
mod telegram;

pub use inbound::InboundEvent;
pub use outbound::AckSink;
pub use telegram::{classify_update, TelegramChannel, TelegramUpdate};
