//! Event dispatcher: consumes classified inbound events one at a time and
//! routes each to its handler.
//!
//! Strictly sequential: an event is handled to completion before the next one
//! is pulled, which keeps per-chat reply ordering trivially correct. Every
//! event gets exactly one reply; pipeline failures are logged for operators
//! and reported to the chat with a generic text.

use crate::channels::{AckSink, InboundEvent};
use crate::commands;
use crate::config::Replies;
use crate::media::MediaPipeline;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Dispatcher {
    sink: Arc<dyn AckSink>,
    pipeline: MediaPipeline,
    replies: Replies,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn AckSink>, pipeline: MediaPipeline, replies: Replies) -> Self {
        Self {
            sink,
            pipeline,
            replies,
        }
    }

    /// Consume events until the inbound channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        log::debug!("inbound channel closed, dispatcher stopping");
    }

    /// Handle one event: route by variant, reply exactly once.
    pub async fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::Command { name, chat_id } => {
                let reply = commands::command_reply(&name, &self.replies);
                self.reply(chat_id, reply).await;
            }
            InboundEvent::Photo { file_id, chat_id } => {
                match self.pipeline.ingest(&file_id).await {
                    Ok(_path) => self.reply(chat_id, &self.replies.photo_saved).await,
                    Err(e) => {
                        log::error!("media pipeline failed for chat {}: {}", chat_id, e);
                        self.reply(chat_id, &self.replies.photo_failed).await;
                    }
                }
            }
            InboundEvent::Text { chat_id } => {
                self.reply(chat_id, &self.replies.send_photo).await;
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.sink.send(chat_id, text).await {
            log::debug!("reply to chat {} failed: {}", chat_id, e);
        }
    }
}
