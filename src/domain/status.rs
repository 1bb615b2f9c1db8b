//! Bot status as reported by the backend and as cached locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// TradingMode indicates whether trades are simulated or submitted for real.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Real market data, no real transactions.
    #[default]
    Simulation,
    /// Real transactions are submitted.
    Live,
}

impl TradingMode {
    /// Mode derived from the SIMULATION_MODE flag.
    pub fn from_simulation_flag(simulation: bool) -> Self {
        if simulation {
            TradingMode::Simulation
        } else {
            TradingMode::Live
        }
    }

    pub fn is_simulation(self) -> bool {
        self == TradingMode::Simulation
    }

    pub fn toggled(self) -> Self {
        match self {
            TradingMode::Simulation => TradingMode::Live,
            TradingMode::Live => TradingMode::Simulation,
        }
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Simulation => write!(f, "simulation"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

impl std::str::FromStr for TradingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulation" => Ok(TradingMode::Simulation),
            "live" => Ok(TradingMode::Live),
            _ => Err(format!("unknown trading mode: {}", s)),
        }
    }
}

/// BotStatus is the backend's view of the bot, pushed on the `status` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub is_running: bool,
    pub mode: TradingMode,
    pub safe_mode: bool,
    #[serde(default)]
    pub total_profit: f64,
    #[serde(default)]
    pub total_trades: u64,
    /// Seconds since the backend started.
    #[serde(default)]
    pub uptime: u64,
}

impl Default for BotStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            mode: TradingMode::Simulation,
            safe_mode: true,
            total_profit: 0.0,
            total_trades: 0,
            uptime: 0,
        }
    }
}

/// Session counters persisted under `bot_session_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Unix milliseconds of the last start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_start_time: Option<i64>,
    #[serde(default)]
    pub session_trades: u64,
    #[serde(default)]
    pub session_profit: f64,
}

/// LocalBotState is the client's best-effort belief about the bot when the
/// backend cannot be asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBotState {
    pub is_running: bool,
    pub mode: TradingMode,
    pub safe_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_start_time: Option<i64>,
    #[serde(default)]
    pub session_trades: u64,
    #[serde(default)]
    pub session_profit: f64,
}

impl Default for LocalBotState {
    fn default() -> Self {
        Self {
            is_running: false,
            mode: TradingMode::Live,
            safe_mode: true,
            last_start_time: None,
            session_trades: 0,
            session_profit: 0.0,
        }
    }
}

impl LocalBotState {
    /// Session counters split out for persistence.
    pub fn session(&self) -> SessionData {
        SessionData {
            last_start_time: self.last_start_time,
            session_trades: self.session_trades,
            session_profit: self.session_profit,
        }
    }

    pub fn with_session(mut self, session: &SessionData) -> Self {
        self.last_start_time = session.last_start_time;
        self.session_trades = session.session_trades;
        self.session_profit = session.session_profit;
        self
    }

    /// Seconds since the last start, zero when never started.
    pub fn uptime(&self, now: DateTime<Utc>) -> u64 {
        uptime_since(self.last_start_time, now)
    }
}

/// Whole seconds elapsed since `start_ms`, clamped at zero.
pub fn uptime_since(start_ms: Option<i64>, now: DateTime<Utc>) -> u64 {
    match start_ms {
        Some(start) => {
            let elapsed = now.timestamp_millis() - start;
            if elapsed > 0 { (elapsed / 1000) as u64 } else { 0 }
        }
        None => 0,
    }
}
