//! Single-owner container for everything the client renders.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::feed::{BoundedFeed, LOG_CAPACITY, OPPORTUNITY_CAPACITY};
use super::reconcile::{Connectivity, ConnectivityPolicy, EffectiveStatus, reconcile};
use crate::backend::{MonitoringStats, ServerEvent, SettingsUpdated};
use crate::domain::{ArbitrageOpportunity, BotStatus, CommandOutcome, LocalBotState, LogEntry};
use crate::settings::SettingsData;

/// Lifecycle of the backend server process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendStatus {
    Starting,
    Running,
    #[default]
    Stopped,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Starting => write!(f, "starting"),
            BackendStatus::Running => write!(f, "running"),
            BackendStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Sidebar tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Home,
    Settings,
    Info,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Home, Tab::Settings, Tab::Info];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Settings => "Settings",
            Tab::Info => "Info",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "dashboard" => Ok(Tab::Home),
            "settings" => Ok(Tab::Settings),
            "info" => Ok(Tab::Info),
            _ => Err(format!("unknown tab: {}", s)),
        }
    }
}

/// Last user-facing command result.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub outcome: CommandOutcome,
    pub at: DateTime<Utc>,
}

/// What applying an event changed that the coordinator must act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Connectivity {
        previous: Connectivity,
        next: Connectivity,
    },
    TradeExecuted {
        profit: f64,
    },
    Updated,
}

/// Client state. Owned by one task; everything else sends it events.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: SettingsData,
    /// None until the local cache has been read.
    pub local: Option<LocalBotState>,
    /// Last `status` pushed by the backend.
    pub remote: Option<BotStatus>,
    pub connectivity: Connectivity,
    pub policy: ConnectivityPolicy,
    pub opportunities: BoundedFeed<ArbitrageOpportunity>,
    pub logs: BoundedFeed<LogEntry>,
    pub backend: BackendStatus,
    pub active_tab: Tab,
    pub notice: Option<Notice>,
    pub stats: Option<MonitoringStats>,
    /// The backend has pushed at least one opportunity.
    pub backend_feeds_opportunities: bool,
}

impl AppState {
    pub fn new(policy: ConnectivityPolicy) -> Self {
        Self {
            settings: SettingsData::default(),
            local: None,
            remote: None,
            connectivity: Connectivity::default(),
            policy,
            opportunities: BoundedFeed::new(OPPORTUNITY_CAPACITY),
            logs: BoundedFeed::new(LOG_CAPACITY),
            backend: BackendStatus::Stopped,
            active_tab: Tab::Home,
            notice: None,
            stats: None,
            backend_feeds_opportunities: false,
        }
    }

    pub fn apply(&mut self, event: ServerEvent) -> Applied {
        match event {
            ServerEvent::Connected => self.set_backend_connected(true),
            ServerEvent::Disconnected => self.set_backend_connected(false),
            ServerEvent::Status(status) => {
                self.remote = Some(status);
                Applied::Updated
            }
            ServerEvent::Opportunity(opportunity) => {
                self.backend_feeds_opportunities = true;
                self.opportunities.push(opportunity);
                Applied::Updated
            }
            ServerEvent::Opportunities(mut batch) => {
                if !batch.is_empty() {
                    self.backend_feeds_opportunities = true;
                }
                // Oldest first so index 0 ends up holding the newest.
                batch.sort_by_key(|o| o.timestamp);
                for opportunity in batch {
                    self.opportunities.push(opportunity);
                }
                Applied::Updated
            }
            ServerEvent::TradeExecuted(trade) => {
                self.record_trade(trade.profit);
                Applied::TradeExecuted {
                    profit: trade.profit,
                }
            }
            ServerEvent::SettingsData(settings) => {
                self.replace_settings(settings);
                Applied::Updated
            }
            ServerEvent::SettingsUpdated(update) => {
                self.apply_settings_update(update);
                Applied::Updated
            }
        }
    }

    fn set_backend_connected(&mut self, connected: bool) -> Applied {
        let previous = self.connectivity;
        self.connectivity.backend_connected = connected;
        Applied::Connectivity {
            previous,
            next: self.connectivity,
        }
    }

    /// Host network reachability changed.
    pub fn set_network_online(&mut self, online: bool) -> Applied {
        let previous = self.connectivity;
        self.connectivity.network_online = online;
        Applied::Connectivity {
            previous,
            next: self.connectivity,
        }
    }

    /// Adds one trade to both the remote and session totals.
    pub fn record_trade(&mut self, profit: f64) {
        if let Some(remote) = self.remote.as_mut() {
            remote.total_profit += profit;
            remote.total_trades += 1;
        }
        if let Some(local) = self.local.as_mut() {
            local.session_profit += profit;
            local.session_trades += 1;
        }
    }

    /// Takes settings pushed by the backend. Its payload may carry both mode
    /// flags false; SIMULATION_MODE decides.
    fn replace_settings(&mut self, settings: SettingsData) {
        if !settings.modes_consistent() {
            warn!(
                simulation = settings.simulation_mode,
                execution = settings.execution_mode,
                "backend sent disagreeing mode flags, realigned from SIMULATION_MODE"
            );
        }
        self.settings = settings.normalized();
    }

    fn apply_settings_update(&mut self, update: SettingsUpdated) {
        let SettingsUpdated {
            success,
            settings,
            message,
        } = update;

        if success {
            if let Some(settings) = settings {
                self.replace_settings(settings);
            }
            let message = if message.is_empty() {
                "Settings updated".to_string()
            } else {
                message
            };
            self.notify(CommandOutcome::ok(message));
        } else {
            let message = if message.is_empty() {
                "Failed to update settings".to_string()
            } else {
                message
            };
            self.notify(CommandOutcome::failed(message));
        }
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    pub fn push_opportunity(&mut self, opportunity: ArbitrageOpportunity) {
        self.opportunities.push(opportunity);
    }

    pub fn notify(&mut self, outcome: CommandOutcome) {
        self.notice = Some(Notice {
            outcome,
            at: Utc::now(),
        });
    }

    pub fn effective(&self, now: DateTime<Utc>) -> EffectiveStatus {
        reconcile(
            self.local.as_ref(),
            self.remote.as_ref(),
            self.connectivity,
            self.policy,
            now,
        )
    }
}
