//! Telegram 渠道 - 发送到固定 chat

use crate::notification::channel::{NotificationMessage, NotificationSink};
use crate::telegram::{ParseMode, TelegramClient};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Telegram 渠道
pub struct TelegramChannel {
    client: Arc<TelegramClient>,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: Arc<TelegramClient>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    /// 失败直接返回，由调用方记录
    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        self.client
            .send_message(&self.chat_id, &message.content, Some(ParseMode::Html))
            .await?;
        debug!(chat_id = %self.chat_id, kind = ?message.kind, "Message sent");
        Ok(())
    }
}
