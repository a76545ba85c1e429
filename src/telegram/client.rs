//! Telegram Bot API 客户端

use super::types::{ApiResponse, BotUser, GetUpdatesRequest, ParseMode, SendMessageRequest, Update};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Bot API 基础 URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error{}: {description}", .code.map(|c| format!(" {}", c)).unwrap_or_default())]
    Api {
        code: Option<i64>,
        description: String,
    },
}

/// Telegram 客户端
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    /// `<api>/bot<token>`
    base: String,
    timeout: Duration,
}

impl TelegramClient {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, TelegramError> {
        Self::with_api_url(TELEGRAM_API_URL, bot_token, timeout)
    }

    /// 使用自定义 API 地址（本地 Bot API server）
    pub fn with_api_url(api_url: &str, bot_token: &str, timeout: Duration) -> Result<Self, TelegramError> {
        // 每个请求单独设置超时，getUpdates 长轮询需要更长的时间
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
            timeout,
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method, "Telegram API call");
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            (_, _) => Err(TelegramError::Api {
                code: response.error_code,
                description: response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }

    /// 校验 token，返回 bot 自身信息
    pub async fn get_me(&self) -> Result<BotUser, TelegramError> {
        self.call("getMe", &serde_json::json!({}), self.timeout).await
    }

    /// 发送消息
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };
        let _: serde_json::Value = self.call("sendMessage", &request, self.timeout).await?;
        Ok(())
    }

    /// 长轮询获取更新
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request, self.timeout + Duration::from_secs(timeout_secs))
            .await
    }
}
