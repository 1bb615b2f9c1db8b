//! Scrolling activity log.

use chrono::Local;
use serde::Serialize;

use crate::domain::{LogEntry, LogLevel};
use crate::state::BoundedFeed;

/// Lines shown at once.
pub const LOG_PANEL_ROWS: usize = 15;

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub time: String,
    pub icon: &'static str,
    #[serde(skip)]
    pub colour: &'static str,
    pub source: Option<String>,
    pub message: String,
}

pub fn icon(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "ℹ",
        LogLevel::Success => "✓",
        LogLevel::Warning => "⚠",
        LogLevel::Error => "✗",
        LogLevel::Debug => "·",
    }
}

/// ANSI colour escape for a level.
pub fn colour(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "\x1b[34m",
        LogLevel::Success => "\x1b[32m",
        LogLevel::Warning => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
        LogLevel::Debug => "\x1b[90m",
    }
}

/// The newest `rows` entries, oldest of them first.
pub fn lines(logs: &BoundedFeed<LogEntry>, rows: usize) -> Vec<LogLine> {
    let mut newest: Vec<&LogEntry> = logs.iter().take(rows).collect();
    newest.reverse();
    newest
        .into_iter()
        .map(|entry| LogLine {
            time: entry
                .timestamp
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
            icon: icon(entry.level),
            colour: colour(entry.level),
            source: entry.source.clone(),
            message: entry.message.clone(),
        })
        .collect()
}

pub fn render(lines: &[LogLine]) -> String {
    let mut out = String::from("Activity Log\n");
    if lines.is_empty() {
        out.push_str("  No activity yet\n");
    }
    for line in lines {
        let source = line
            .source
            .as_deref()
            .map(|s| format!("[{}] ", s))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {} {}{}{} {}{}\n",
            line.time, line.colour, line.icon, RESET, source, line.message
        ));
    }
    out
}
