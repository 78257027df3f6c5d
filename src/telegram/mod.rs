//! Telegram transport: command dispatch and the inline-keyboard messenger.

pub mod client;
pub mod commands;
pub mod messenger;

pub use client::run_telegram_daemon;
pub use messenger::TelegramMessenger;
