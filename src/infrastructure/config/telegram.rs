//! Telegram alert configuration.

use serde::Deserialize;

/// Environment variable holding the bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable that overrides `chat_id`.
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Telegram notification configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAppConfig {
    /// Send health alerts to Telegram.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Loaded from `TELEGRAM_BOT_TOKEN`, never from the file.
    #[serde(skip)]
    pub bot_token: Option<String>,
}

impl TelegramAppConfig {
    /// Fill secrets and overrides from the environment.
    pub(crate) fn apply_env(&mut self) {
        self.bot_token = std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());
        if let Some(chat_id) = std::env::var(CHAT_ID_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            self.chat_id = Some(chat_id);
        }
    }

    /// Both credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// Notifier settings when enabled and fully configured.
    #[cfg(feature = "telegram")]
    #[must_use]
    pub fn notifier_config(&self) -> Option<crate::adapter::outbound::notifier::TelegramConfig> {
        if !self.enabled {
            return None;
        }
        Some(crate::adapter::outbound::notifier::TelegramConfig {
            bot_token: self.bot_token.clone()?,
            chat_id: self.chat_id?,
        })
    }
}
