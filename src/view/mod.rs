//! Text rendering of the application state.
//!
//! Each panel is built in two steps: a view model of display strings derived
//! from `AppState`, then a plain-text render of that model.

pub mod controls;
pub mod dashboard;
pub mod info;
pub mod log_panel;
pub mod opportunities;
pub mod settings_form;
pub mod sidebar;
pub mod status_bar;

use chrono::{DateTime, Utc};

use crate::state::{AppState, Tab};

pub use settings_form::{NumericInput, SettingRow, SettingsForm};

/// Clears the terminal and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Renders the whole screen for the active tab.
pub fn render(state: &AppState, form: &SettingsForm, now: DateTime<Utc>) -> String {
    let effective = state.effective(now);

    let mut out = sidebar::render(state.active_tab);
    out.push_str(&status_bar::render(&status_bar::status_bar(
        state, &effective,
    )));
    out.push('\n');

    match state.active_tab {
        Tab::Home => {
            out.push_str(&controls::render(&controls::panel(&effective)));
            out.push('\n');
            out.push_str(&dashboard::render(&dashboard::dashboard(state, &effective)));
            out.push('\n');
            out.push_str(&opportunities::render(&opportunities::table(
                state, &effective,
            )));
            out.push('\n');
            out.push_str(&log_panel::render(&log_panel::lines(
                &state.logs,
                log_panel::LOG_PANEL_ROWS,
            )));
        }
        Tab::Settings => out.push_str(&settings_form::render(form)),
        Tab::Info => out.push_str(&info::render()),
    }

    if let Some(notice) = &state.notice {
        let mark = if notice.outcome.success { "✓" } else { "✗" };
        out.push_str(&format!("\n{} {}\n", mark, notice.outcome.message));
    }
    out.push_str(&format!("{}\n", sidebar::FOOTER));
    out
}
