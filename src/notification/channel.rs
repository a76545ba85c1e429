//! 通知出口 trait 定义

use crate::state::EventKind;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// 消息类别（用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Event(EventKind),
    Inactivity,
}

/// 出站通知消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    /// 已格式化的 HTML 内容
    pub content: String,
    pub kind: MessageKind,
}

impl NotificationMessage {
    pub fn event(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MessageKind::Event(kind),
        }
    }

    pub fn inactivity(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MessageKind::Inactivity,
        }
    }
}

/// 通知出口，目标固定
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 出口名称（用于日志）
    fn name(&self) -> &str;

    /// 发送消息，不保证送达
    async fn send(&self, message: &NotificationMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = NotificationMessage::event(EventKind::Issue, "hello");
        assert_eq!(msg.kind, MessageKind::Event(EventKind::Issue));
        assert_eq!(msg.content, "hello");

        let msg = NotificationMessage::inactivity("idle");
        assert_eq!(msg.kind, MessageKind::Inactivity);
    }
}
