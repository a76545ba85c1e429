//! 标准输出渠道 - dry-run 时只打印不发送

use crate::notification::channel::{NotificationMessage, NotificationSink};
use anyhow::Result;
use async_trait::async_trait;

/// 把消息打印到 stdout
pub struct StdoutChannel;

impl StdoutChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for StdoutChannel {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        println!("[DRY-RUN] {:?}\n{}\n", message.kind, message.content);
        Ok(())
    }
}
