//! GitLab Activity Monitor - 轮询 GitLab 项目动态并推送到 Telegram

pub mod commands;
pub mod config;
pub mod gitlab;
pub mod notification;
pub mod poller;
pub mod state;
pub mod telegram;

pub use commands::{Command, CommandContext, CommandListener};
pub use config::{Config, ConfigError, MonitorSettings};
pub use gitlab::{GitlabClient, GitlabError, SourceControl};
pub use notification::{MessageFormatter, NotificationMessage, NotificationSink, StdoutChannel, TelegramChannel, ThrottledSink};
pub use poller::{CycleReport, Poller};
pub use state::{ActivityTracker, DedupCache, EventKind, InactiveMember, MonitorState, SharedState};
pub use telegram::{TelegramClient, TelegramError};
