//! Backend connection and process launch configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Where the trading backend lives and how to start it.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// HTTP base URL of the Socket.IO server (e.g. "http://127.0.0.1:8000").
    #[serde(default = "default_url")]
    pub url: String,
    /// Delay between launching the backend and opening the socket.
    #[serde(default = "default_connect_delay", with = "duration")]
    pub connect_delay: Duration,
    /// Delay before attempting to reconnect after disconnection.
    #[serde(default = "default_reconnect_delay", with = "duration")]
    pub reconnect_delay: Duration,
    /// How to start the backend server process.
    #[serde(default)]
    pub launch: LaunchConfig,
    /// How to start the arbitrage bot process.
    #[serde(default)]
    pub bot: BotProcessConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_delay: default_connect_delay(),
            reconnect_delay: default_reconnect_delay(),
            launch: LaunchConfig::default(),
            bot: BotProcessConfig::default(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(5)
}

/// Backend server launch settings.
///
/// A bundled executable is preferred when it exists; otherwise the script is
/// run with the configured python interpreter.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// When false the backend is not launched, only connected to.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bundled server binary name, without the platform suffix.
    #[serde(default = "default_bundled")]
    pub bundled_executable: String,
    /// Python interpreter.
    #[serde(default = "default_python")]
    pub python: String,
    /// Fallback server script.
    #[serde(default = "default_server_script")]
    pub script: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bundled_executable: default_bundled(),
            python: default_python(),
            script: default_server_script(),
        }
    }
}

/// Arbitrage bot process settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotProcessConfig {
    #[serde(default = "default_python")]
    pub program: String,
    #[serde(default = "default_bot_args")]
    pub args: Vec<String>,
}

impl Default for BotProcessConfig {
    fn default() -> Self {
        Self {
            program: default_python(),
            args: default_bot_args(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_bundled() -> String {
    "arbitrage-bot-server".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

fn default_server_script() -> String {
    "../websocket_server.py".to_string()
}

fn default_bot_args() -> Vec<String> {
    vec!["scripts/monitoring/arbitrage_bot.py".to_string()]
}
