//! Telegram adapter (teloxide).
//!
//! Implements the `panelbot-core` messenger and transport ports over the
//! Telegram Bot API with long polling.

pub mod messenger;
pub mod transport;

pub use messenger::TelegramMessenger;
pub use transport::TelegramTransport;
