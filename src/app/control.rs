//! Local-first bot operations.
//!
//! Every operation goes through the host and the local cache only, so the
//! controls keep working while the backend socket is down. Results are
//! reported as [`CommandOutcome`] values and never as errors.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backend::{ClientEvent, EventSink, Host, HostError};
use crate::domain::{CommandOutcome, LocalBotState, SessionData, Toggled, TradingMode};
use crate::settings::{SettingsData, SettingsError, SettingsFile};
use crate::state::{BotStateSync, SessionCache};

/// The settings document as reached through the host's file commands.
#[derive(Clone)]
struct HostDocument(Arc<dyn Host>);

#[async_trait]
impl SettingsFile for HostDocument {
    async fn read_raw(&self) -> Result<String, SettingsError> {
        self.0.read_settings_file().await.map_err(settings_error)
    }

    async fn write_raw(&self, content: &str) -> Result<(), SettingsError> {
        self.0
            .write_settings_file(content)
            .await
            .map_err(settings_error)
    }
}

fn settings_error(e: HostError) -> SettingsError {
    match e {
        HostError::Settings(e) => e,
        other => SettingsError::Unavailable(other.to_string()),
    }
}

#[derive(Clone)]
pub struct BotControl {
    host: Arc<dyn Host>,
    document: HostDocument,
    cache: SessionCache,
}

impl BotControl {
    pub fn new(host: Arc<dyn Host>, cache: SessionCache) -> Self {
        Self {
            document: HostDocument(host.clone()),
            host,
            cache,
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Reads the settings document, substituting defaults on failure.
    pub async fn load_settings(&self) -> SettingsData {
        self.document.load().await
    }

    /// Writes the settings document, keeping comments and unknown keys.
    /// An existing document that cannot be read is left alone.
    pub async fn save_settings(&self, settings: &SettingsData) -> CommandOutcome {
        self.document.save(settings).await
    }

    /// Current bot state from the settings document, the host process and
    /// the cached session counters. Each source falls back on its own.
    pub async fn get_bot_status(&self) -> LocalBotState {
        let settings = self.load_settings().await;

        let is_running = match self.host.get_arbitrage_bot_status().await {
            Ok(running) => running,
            Err(e) => {
                warn!(error = %e, "bot status unavailable, assuming stopped");
                false
            }
        };

        let session = match self.cache.session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session cache unavailable");
                SessionData::default()
            }
        };

        LocalBotState {
            is_running,
            mode: settings.mode(),
            safe_mode: settings.safe_mode,
            ..LocalBotState::default()
        }
        .with_session(&session)
    }

    /// Starts the bot process and opens a new session.
    pub async fn start_bot_local(&self, now: DateTime<Utc>) -> CommandOutcome {
        match self.host.start_arbitrage_bot().await {
            Ok(message) => {
                let session = SessionData {
                    last_start_time: Some(now.timestamp_millis()),
                    session_trades: 0,
                    session_profit: 0.0,
                };
                if let Err(e) = self.cache.save_session(&session).await {
                    warn!(error = %e, "failed to reset session data");
                }
                CommandOutcome::ok(message)
            }
            Err(e) => CommandOutcome::failed(format!("Failed to start bot: {}", e)),
        }
    }

    pub async fn stop_bot_local(&self) -> CommandOutcome {
        match self.host.stop_arbitrage_bot().await {
            Ok(message) => CommandOutcome::ok(message),
            Err(e) => CommandOutcome::failed(format!("Failed to stop bot: {}", e)),
        }
    }

    pub async fn toggle_trading_mode(&self) -> Toggled<TradingMode> {
        self.document.toggle_mode().await
    }

    pub async fn toggle_safe_mode(&self) -> Toggled<bool> {
        match self.host.toggle_safe_mode().await {
            Ok(safe_mode) => Toggled::ok(
                format!("Safe mode {}", if safe_mode { "enabled" } else { "disabled" }),
                safe_mode,
            ),
            Err(HostError::Command(message)) => Toggled::failed(message),
            Err(e) => Toggled::failed(format!("Failed to toggle safe mode: {}", e)),
        }
    }

    /// Stores the session counters. The session start time is kept.
    pub async fn update_session_stats(&self, trades: u64, profit: f64) -> SessionData {
        let mut session = match self.cache.session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session cache unavailable");
                SessionData::default()
            }
        };
        session.session_trades = trades;
        session.session_profit = profit;

        if let Err(e) = self.cache.save_session(&session).await {
            warn!(error = %e, "failed to store session stats");
        }
        session
    }

    /// State written by the previous run, if any.
    pub async fn cached_state(&self) -> Option<LocalBotState> {
        match self.cache.bot_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "bot state cache unavailable");
                None
            }
        }
    }

    pub async fn save_state(&self, state: &LocalBotState) {
        if let Err(e) = self.cache.save_bot_state(state).await {
            warn!(error = %e, "failed to cache bot state");
        }
    }

    /// Pushes the local state to the backend. Returns false when not
    /// connected or the emit failed.
    pub async fn sync_with_server(&self, sink: &dyn EventSink, state: &LocalBotState) -> bool {
        if !sink.is_connected() {
            return false;
        }
        match sink
            .emit(&ClientEvent::SyncBotState(BotStateSync::from(state)))
            .await
        {
            Ok(()) => {
                info!("bot state synced with backend");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to sync bot state with backend");
                false
            }
        }
    }
}
