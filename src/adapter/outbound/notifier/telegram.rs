//! Telegram alert delivery.
//!
//! Requires the `telegram` feature to be enabled.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::port::{Alert, AlertNotifier, AlertSeverity};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    pub chat_id: i64,
}

/// Sends alerts to a Telegram chat from a background worker.
pub struct TelegramNotifier {
    sender: mpsc::UnboundedSender<Alert>,
}

impl TelegramNotifier {
    /// Create the notifier and spawn its worker. Must be called inside a
    /// Tokio runtime.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(telegram_worker(config, receiver));
        Self { sender }
    }
}

impl AlertNotifier for TelegramNotifier {
    fn notify(&self, alert: Alert) {
        if self.sender.send(alert).is_err() {
            warn!("Telegram notifier channel closed");
        }
    }
}

async fn telegram_worker(config: TelegramConfig, mut receiver: mpsc::UnboundedReceiver<Alert>) {
    let bot = Bot::new(&config.bot_token);
    let chat_id = ChatId(config.chat_id);

    info!(chat_id = config.chat_id, "Telegram notifier started");

    while let Some(alert) = receiver.recv().await {
        let text = format_alert(&alert);
        if let Err(e) = bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            error!(error = %e, "Failed to send Telegram message");
        }
    }

    warn!("Telegram notifier worker shutting down");
}

fn format_alert(alert: &Alert) -> String {
    let emoji = match alert.severity {
        AlertSeverity::Warning => "⚠️",
        AlertSeverity::Critical => "🛑",
    };
    format!(
        "{} *{}*\n\n{}",
        emoji,
        escape_markdown(&alert.title),
        escape_markdown(&alert.message)
    )
}

fn escape_markdown(text: &str) -> String {
    let special_chars = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("avg 350.5ms (max)"), "avg 350\\.5ms \\(max\\)");
    }

    #[test]
    fn formats_critical_alert() {
        let text = format_alert(&Alert::critical("Feed down", "5 checks failed"));
        assert!(text.starts_with("🛑 *Feed down*"));
        assert!(text.contains("5 checks failed"));
    }
}
