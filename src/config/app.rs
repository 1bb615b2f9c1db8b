//! Application-level configuration.

use serde::Deserialize;

use crate::state::ConnectivityPolicy;

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name used in logs and notifications.
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging verbosity: "debug", "info", "warn", "error".
    pub log_level: Option<String>,
    /// Which trading modes require a live backend connection to run.
    #[serde(default)]
    pub connectivity_policy: ConnectivityPolicy,
}

fn default_name() -> String {
    "arb-desk".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: None,
            connectivity_policy: ConnectivityPolicy::default(),
        }
    }
}
