//! One-line status bar across the top of every tab.

use serde::Serialize;

use crate::format::{add_thousand_separators, format_uptime, format_usd};
use crate::state::{AppState, BackendStatus, EffectiveStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBar {
    pub connection: &'static str,
    pub bot: &'static str,
    pub mode: &'static str,
    pub safe_mode: Option<&'static str>,
    pub uptime: String,
    pub totals: String,
    pub backend: String,
}

pub fn status_bar(state: &AppState, effective: &EffectiveStatus) -> StatusBar {
    let status = &effective.status;

    let connection = if !state.connectivity.network_online {
        "Offline"
    } else if effective.connected {
        "Connected"
    } else {
        "Disconnected"
    };

    let backend = match state.backend {
        BackendStatus::Running => "Backend running".to_string(),
        other => format!("Backend {}", other),
    };

    StatusBar {
        connection,
        bot: if status.is_running { "Active" } else { "Inactive" },
        mode: if status.mode.is_simulation() {
            "Simulation"
        } else {
            "Live"
        },
        safe_mode: status.safe_mode.then_some("Safe Mode"),
        uptime: format_uptime(status.uptime),
        totals: format!(
            "{} trades, {}",
            add_thousand_separators(status.total_trades),
            format_usd(status.total_profit)
        ),
        backend,
    }
}

pub fn render(bar: &StatusBar) -> String {
    let mut parts = vec![bar.connection, bar.bot, bar.mode];
    if let Some(safe) = bar.safe_mode {
        parts.push(safe);
    }
    format!(
        "[{}] Uptime {} | {} | {}\n",
        parts.join("] ["),
        bar.uptime,
        bar.totals,
        bar.backend
    )
}
