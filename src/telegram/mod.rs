pub mod bot;
pub mod client;
pub mod commands;
pub mod types;

pub use bot::{chart_message, Bot};
pub use client::TelegramClient;
pub use commands::Command;
