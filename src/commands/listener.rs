//! Telegram 命令监听 - 长轮询 getUpdates 并回复命令

use super::handlers::{respond, Command, CommandContext};
use crate::notification::escape_html;
use crate::state::SharedState;
use crate::telegram::{ParseMode, TelegramClient, Update};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// getUpdates 长轮询超时（秒）
const LONG_POLL_SECS: u64 = 30;

/// 获取更新失败后的重试间隔
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// 命令监听器
pub struct CommandListener {
    client: Arc<TelegramClient>,
    state: SharedState,
    context: CommandContext,
    bot_username: Option<String>,
    offset: Option<i64>,
}

impl CommandListener {
    pub fn new(
        client: Arc<TelegramClient>,
        state: SharedState,
        context: CommandContext,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            client,
            state,
            context,
            bot_username,
            offset: None,
        }
    }

    /// 持续监听，直到进程退出
    pub async fn run(mut self) {
        info!(bot = ?self.bot_username, "Listening for bot commands");

        loop {
            match self.client.get_updates(self.offset, LONG_POLL_SECS).await {
                Ok(updates) => {
                    for update in updates {
                        self.offset = Some(update.update_id + 1);
                        self.handle_update(&update).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch bot updates");
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: &Update) {
        let Some(message) = update.message.as_ref() else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = Command::parse(text, self.bot_username.as_deref()) else {
            return;
        };

        let chat_id = message.chat.id.to_string();
        debug!(chat_id = %chat_id, command = ?command, "Handling command");

        let reply = reply_text(command, &self.context, &self.state);
        if let Err(e) = self
            .client
            .send_message(&chat_id, &reply, Some(ParseMode::Html))
            .await
        {
            warn!(chat_id = %chat_id, command = ?command, error = %e, "Failed to send command reply");
        }
    }
}

/// 命令出错时把错误回复给请求者
pub fn reply_text(command: Command, context: &CommandContext, state: &SharedState) -> String {
    match respond(command, context, state, Utc::now()) {
        Ok(text) => text,
        Err(e) => {
            warn!(command = ?command, error = %e, "Command failed");
            format!("❌ Error: {}", escape_html(&e.to_string()))
        }
    }
}
