//! Local file and state-cache locations.

use serde::Deserialize;

/// Where local documents live.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Trading settings document (key=value with comments).
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// SQLite database backing the local state cache.
    #[serde(default = "default_state_db")]
    pub state_db: String,
    /// Monitoring stats file name.
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
    /// Extra base directories searched for the stats file, in order.
    #[serde(default)]
    pub stats_dirs: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            state_db: default_state_db(),
            stats_file: default_stats_file(),
            stats_dirs: Vec::new(),
        }
    }
}

fn default_settings_path() -> String {
    ".env".to_string()
}

fn default_state_db() -> String {
    "arb_desk.db".to_string()
}

fn default_stats_file() -> String {
    "monitoring_stats.json".to_string()
}
