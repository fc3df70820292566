//! Alert notification adapters.

mod log;

#[cfg(feature = "telegram")]
mod telegram;

pub use log::LogNotifier;

#[cfg(feature = "telegram")]
pub use telegram::{TelegramConfig, TelegramNotifier};
