//! Telegram Bot channel — long polling + MarkdownV2 message sending.
//!
//! The client implements the `Messenger` collaborator consumed by the
//! scheduler; formatting and command parsing are pure functions so the
//! markup dialect can be tested without a live bot.

pub mod commands;
pub mod format;
pub mod markdown;

mod client;

pub use client::{TelegramClient, TelegramMessage, TelegramUpdate, TelegramUser};
pub use commands::BotCommand;
