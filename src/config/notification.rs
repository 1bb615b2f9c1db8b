//! Notification configuration.

use serde::Deserialize;

/// Notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Show desktop-style notifications in the client.
    #[serde(default = "default_desktop")]
    pub desktop: bool,
    /// Telegram bot notifications.
    pub telegram: Option<TelegramConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            telegram: None,
        }
    }
}

fn default_desktop() -> bool {
    true
}

/// Telegram notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Whether Telegram notifications are active.
    #[serde(default)]
    pub enabled: bool,
    /// Bot token (loaded from TELEGRAM_BOT_TOKEN env var).
    #[serde(skip)]
    pub bot_token: String,
    /// Target chat/channel ID (loaded from TELEGRAM_CHAT_ID env var).
    #[serde(skip)]
    pub chat_id: String,
}
