//! Configuration loading and validation for the desktop client.
//!
//! Uses serde_yaml to load YAML configuration files with support for
//! environment variable overrides for the backend URL, the settings document
//! path and Telegram credentials.

mod app;
mod backend;
mod duration;
mod error;
mod notification;
mod polling;
mod storage;

pub use app::AppConfig;
pub use backend::{BackendConfig, BotProcessConfig, LaunchConfig};
pub use error::ConfigError;
pub use notification::{NotificationConfig, TelegramConfig};
pub use polling::PollingConfig;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Root configuration structure for the client.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Application-level settings like name and log level.
    #[serde(default)]
    pub app: AppConfig,
    /// Backend socket URL and process launch settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Poll and refresh timers.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Local file locations.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Alert channels.
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides applied after parsing:
    /// - `ARB_DESK_BACKEND_URL`, `ARB_DESK_SETTINGS_PATH`
    /// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse, apply env overrides and validate.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults with env overrides, used when no file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("ARB_DESK_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend.url = url.trim().to_string();
            }
        }

        if let Ok(path) = env::var("ARB_DESK_SETTINGS_PATH") {
            if !path.trim().is_empty() {
                self.storage.settings_path = path.trim().to_string();
            }
        }

        if let Some(ref mut telegram) = self.notification.telegram {
            if telegram.enabled {
                telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
                telegram.chat_id = env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
            }
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Validation("backend.url is required".into()));
        }

        let scheme_ok = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        if !scheme_ok {
            return Err(ConfigError::Validation(format!(
                "backend.url must start with http(s):// or ws(s)://, got {}",
                url
            )));
        }

        if self.storage.settings_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.settings_path is required".into(),
            ));
        }

        let timers = [
            ("polling.stats_interval", self.polling.stats_interval),
            ("polling.opportunity_refresh", self.polling.opportunity_refresh),
            ("polling.reconcile_interval", self.polling.reconcile_interval),
        ];
        for (name, interval) in timers {
            if interval.is_zero() {
                return Err(ConfigError::Validation(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }
}
