//! 具体渠道实现

pub mod stdout;
pub mod telegram;

pub use stdout::StdoutChannel;
pub use telegram::TelegramChannel;
