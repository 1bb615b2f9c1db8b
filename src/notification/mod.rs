//! Desktop and Telegram notifications.

mod notifier;
mod telegram;

pub use notifier::*;
pub use telegram::TelegramNotifier;

use std::sync::Arc;

use tracing::warn;

use crate::config::NotificationConfig;

/// Builds the notifier chain described by the config. A Telegram section
/// without credentials is skipped with a warning.
pub fn from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(DesktopNotifier::new(config.desktop))];

    if let Some(telegram) = config.telegram.as_ref().filter(|t| t.enabled) {
        match TelegramNotifier::new(telegram) {
            Ok(notifier) => notifiers.push(Arc::new(notifier)),
            Err(e) => warn!(error = %e, "telegram notifications disabled"),
        }
    }

    Arc::new(MultiNotifier::new(notifiers))
}
