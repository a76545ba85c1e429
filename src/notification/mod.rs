//! 通知层 - 格式化、限流并发送到聊天渠道
//!
//! # 使用示例
//! ```ignore
//! use gitlab_activity_monitor::notification::{NotificationMessage, ThrottledSink, TelegramChannel};
//!
//! let sink = ThrottledSink::new(TelegramChannel::new(client, chat_id), Duration::from_secs(1));
//! sink.send(&NotificationMessage::inactivity("...")).await?;
//! ```

pub mod channel;
pub mod channels;
pub mod formatter;
pub mod throttle;

pub use channel::{MessageKind, NotificationMessage, NotificationSink};
pub use channels::{StdoutChannel, TelegramChannel};
pub use formatter::{escape_html, pipeline_emoji, MessageFormatter};
pub use throttle::ThrottledSink;
