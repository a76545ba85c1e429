//! 机器人命令：/start /status /members /inactive

pub mod handlers;
pub mod listener;

pub use handlers::{render, respond, Command, CommandContext, COLLECTING_DATA, TOP_N};
pub use listener::{reply_text, CommandListener};
