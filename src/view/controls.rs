//! Bot control panel.

use serde::Serialize;

use crate::domain::TradingMode;
use crate::format::format_uptime;
use crate::state::EffectiveStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub label: String,
    pub description: String,
    pub enabled: bool,
    pub command: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsPanel {
    pub start_stop: Control,
    pub mode: Control,
    pub safe_mode: Control,
    pub running: String,
    pub connection: String,
    pub uptime: String,
    pub blocked_reason: Option<String>,
}

pub fn panel(effective: &EffectiveStatus) -> ControlsPanel {
    let status = &effective.status;

    let start_stop = Control {
        label: if status.is_running { "Stop Bot" } else { "Start Bot" }.to_string(),
        description: String::new(),
        enabled: effective.controls.start_stop,
        command: if status.is_running { "stop" } else { "start" },
    };

    let mode = match status.mode {
        TradingMode::Simulation => Control {
            label: "Simulation Mode".to_string(),
            description: "No real transactions will be executed".to_string(),
            enabled: effective.controls.toggle_mode,
            command: "mode",
        },
        TradingMode::Live => Control {
            label: "Live Trading".to_string(),
            description: "Real money will be used for trades".to_string(),
            enabled: effective.controls.toggle_mode,
            command: "mode",
        },
    };

    let safe_mode = Control {
        label: format!("Safe Mode {}", if status.safe_mode { "ON" } else { "OFF" }),
        description: if status.safe_mode {
            "Small amounts, safe tokens only"
        } else {
            "Full trading capabilities enabled"
        }
        .to_string(),
        enabled: effective.controls.toggle_safe_mode,
        command: "safe",
    };

    ControlsPanel {
        start_stop,
        mode,
        safe_mode,
        running: if status.is_running { "Running" } else { "Stopped" }.to_string(),
        connection: if effective.connected {
            "Connected"
        } else {
            "Disconnected"
        }
        .to_string(),
        uptime: format_uptime(status.uptime),
        blocked_reason: effective.blocked_reason.map(str::to_string),
    }
}

fn render_control(control: &Control) -> String {
    let state = if control.enabled { "" } else { " (disabled)" };
    if control.description.is_empty() {
        format!("  [{}] {}{}\n", control.command, control.label, state)
    } else {
        format!(
            "  [{}] {}{} - {}\n",
            control.command, control.label, state, control.description
        )
    }
}

pub fn render(panel: &ControlsPanel) -> String {
    let mut out = format!(
        "Bot Control: {} | {} | Uptime {}\n",
        panel.running, panel.connection, panel.uptime
    );
    out.push_str(&render_control(&panel.start_stop));
    out.push_str(&render_control(&panel.mode));
    out.push_str(&render_control(&panel.safe_mode));
    if let Some(reason) = &panel.blocked_reason {
        out.push_str(&format!("  ! {}\n", reason));
    }
    out
}
