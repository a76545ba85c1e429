//! Telegram Bot API 接入：发送通知 + 接收命令

pub mod client;
pub mod types;

pub use client::{TelegramClient, TelegramError, TELEGRAM_API_URL};
pub use types::{BotUser, Chat, Message, ParseMode, Update};
