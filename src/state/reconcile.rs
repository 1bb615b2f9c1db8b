//! Merges the local cache, the remote status and connectivity into the one
//! status the client renders.
//!
//! Precedence per field:
//!
//! | field                           | source                                                  |
//! |---------------------------------|---------------------------------------------------------|
//! | mode, safe_mode                 | local, else remote, else defaults                       |
//! | is_running                      | remote when connected in live mode, else local; forced  |
//! |                                 | false when the connectivity precondition fails          |
//! | total_profit/total_trades/uptime| remote while connected, else local session counters     |
//!
//! Everything here is pure so it can be exercised without sockets or files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BotStatus, LocalBotState, TradingMode};

/// Which trading modes need a live backend connection to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityPolicy {
    /// Only live trading needs the backend; simulation runs offline.
    LiveOnly,
    /// Both modes need the backend, since simulation also trades on real market data.
    #[default]
    AllModes,
}

impl ConnectivityPolicy {
    pub fn requires_connection(self, mode: TradingMode) -> bool {
        match self {
            ConnectivityPolicy::LiveOnly => mode == TradingMode::Live,
            ConnectivityPolicy::AllModes => true,
        }
    }

    fn blocked_reason(self) -> &'static str {
        match self {
            ConnectivityPolicy::LiveOnly => "Live trading requires a backend connection",
            ConnectivityPolicy::AllModes => "Backend connection required",
        }
    }
}

/// Connectivity observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    /// Host network reachability (online/offline events).
    pub network_online: bool,
    /// Socket to the backend is open.
    pub backend_connected: bool,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            network_online: true,
            backend_connected: false,
        }
    }
}

impl Connectivity {
    pub fn is_connected(&self) -> bool {
        self.network_online && self.backend_connected
    }
}

/// Which controls the user may use right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlAvailability {
    pub start_stop: bool,
    pub toggle_mode: bool,
    pub toggle_safe_mode: bool,
    pub execute_trade: bool,
}

impl ControlAvailability {
    pub const DISABLED: ControlAvailability = ControlAvailability {
        start_stop: false,
        toggle_mode: false,
        toggle_safe_mode: false,
        execute_trade: false,
    };
}

/// The reconciled status actually rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveStatus {
    pub status: BotStatus,
    /// Local state has been loaded.
    pub known: bool,
    pub connected: bool,
    pub controls: ControlAvailability,
    /// Why start/stop is unavailable, when it is.
    pub blocked_reason: Option<&'static str>,
}

/// Produces the effective status from the three inputs.
pub fn reconcile(
    local: Option<&LocalBotState>,
    remote: Option<&BotStatus>,
    connectivity: Connectivity,
    policy: ConnectivityPolicy,
    now: DateTime<Utc>,
) -> EffectiveStatus {
    let connected = connectivity.is_connected();
    let live_remote = remote.filter(|_| connected);
    let fallback = BotStatus::default();

    let (mode, safe_mode) = match (local, remote) {
        (Some(l), _) => (l.mode, l.safe_mode),
        (None, Some(r)) => (r.mode, r.safe_mode),
        (None, None) => (fallback.mode, fallback.safe_mode),
    };

    let precondition_met = connected || !policy.requires_connection(mode);

    let reported_running = match (local, live_remote) {
        (Some(_), Some(r)) if mode == TradingMode::Live => r.is_running,
        (Some(l), _) => l.is_running,
        (None, Some(r)) => r.is_running,
        (None, None) => false,
    };
    let is_running = reported_running && precondition_met;

    let (total_profit, total_trades, uptime) = match (live_remote, local) {
        (Some(r), _) => (r.total_profit, r.total_trades, r.uptime),
        (None, Some(l)) => (
            l.session_profit,
            l.session_trades,
            if is_running { l.uptime(now) } else { 0 },
        ),
        (None, None) => (0.0, 0, 0),
    };

    let status = BotStatus {
        is_running,
        mode,
        safe_mode,
        total_profit,
        total_trades,
        uptime,
    };

    if local.is_none() {
        return EffectiveStatus {
            status,
            known: false,
            connected,
            controls: ControlAvailability::DISABLED,
            blocked_reason: Some("Bot state unknown"),
        };
    }

    EffectiveStatus {
        status,
        known: true,
        connected,
        controls: ControlAvailability {
            start_stop: precondition_met,
            toggle_mode: !is_running,
            toggle_safe_mode: !is_running,
            execute_trade: connected && is_running,
        },
        blocked_reason: (!precondition_met).then(|| policy.blocked_reason()),
    }
}

/// Direction of a connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityChange {
    Restored,
    Lost,
    Unchanged,
}

pub fn classify(previous: Connectivity, next: Connectivity) -> ConnectivityChange {
    match (previous.is_connected(), next.is_connected()) {
        (false, true) => ConnectivityChange::Restored,
        (true, false) => ConnectivityChange::Lost,
        _ => ConnectivityChange::Unchanged,
    }
}

/// Payload of the `sync_bot_state` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStateSync {
    pub is_running: bool,
    pub mode: TradingMode,
    pub safe_mode: bool,
    pub session_trades: u64,
    pub session_profit: f64,
}

impl From<&LocalBotState> for BotStateSync {
    fn from(state: &LocalBotState) -> Self {
        Self {
            is_running: state.is_running,
            mode: state.mode,
            safe_mode: state.safe_mode,
            session_trades: state.session_trades,
            session_profit: state.session_profit,
        }
    }
}

/// Side effects the coordinator must carry out after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Push the local state to the backend so both sides reconverge.
    SyncBotState(BotStateSync),
    /// Best-effort stop of the local bot process.
    StopBot,
}

/// Applies a connectivity transition to the local state.
pub fn on_connectivity_change(
    local: &LocalBotState,
    previous: Connectivity,
    next: Connectivity,
    policy: ConnectivityPolicy,
) -> (LocalBotState, Vec<Effect>) {
    match classify(previous, next) {
        ConnectivityChange::Restored => (
            local.clone(),
            vec![Effect::SyncBotState(BotStateSync::from(local))],
        ),
        ConnectivityChange::Lost if local.is_running && policy.requires_connection(local.mode) => {
            let mut stopped = local.clone();
            stopped.is_running = false;
            (stopped, vec![Effect::StopBot])
        }
        _ => (local.clone(), Vec::new()),
    }
}
