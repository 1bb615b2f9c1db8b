//! Activity feed entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LOG_ID: AtomicU64 = AtomicU64::new(1);

/// Severity of a log entry, keyed to an icon and colour in the log panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    /// Classifies a free-text line by the markers the bot prints.
    pub fn infer(line: &str) -> Self {
        let lower = line.to_ascii_lowercase();
        if lower.contains("error") || lower.contains("failed") || lower.contains("traceback") {
            LogLevel::Error
        } else if lower.contains("warn") {
            LogLevel::Warning
        } else if lower.contains("success")
            || lower.contains("executed")
            || lower.contains("profit:")
            || line.contains('✅')
        {
            LogLevel::Success
        } else if lower.contains("debug") {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}

/// One line in the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let seq = NEXT_LOG_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("log-{}", seq),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parses one line of bot output into an entry.
    ///
    /// Structured lines look like `{"level":"warning","message":"...","source":"scanner"}`;
    /// anything else is taken verbatim with an inferred level.
    pub fn from_bot_line(line: &str, default_source: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        #[derive(Deserialize)]
        struct Structured {
            #[serde(default)]
            level: Option<LogLevel>,
            message: String,
            #[serde(default)]
            source: Option<String>,
        }

        if trimmed.starts_with('{') {
            if let Ok(structured) = serde_json::from_str::<Structured>(trimmed) {
                let level = structured
                    .level
                    .unwrap_or_else(|| LogLevel::infer(&structured.message));
                let source = structured
                    .source
                    .unwrap_or_else(|| default_source.to_string());
                return Some(LogEntry::new(level, structured.message).with_source(source));
            }
        }

        Some(LogEntry::new(LogLevel::infer(trimmed), trimmed).with_source(default_source))
    }
}
