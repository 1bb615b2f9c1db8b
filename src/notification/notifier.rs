use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::TradingMode;
use crate::format::{add_thousand_separators, format_duration};

/// Notification event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Bot started
    Startup,
    /// Bot stopped
    Shutdown,
    /// Backend connection state changed
    Connection,
    /// Something failed
    Error,
    /// Free-form message from a host command
    Message,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Startup => write!(f, "startup"),
            EventType::Shutdown => write!(f, "shutdown"),
            EventType::Connection => write!(f, "connection"),
            EventType::Error => write!(f, "error"),
            EventType::Message => write!(f, "message"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartupData {
    pub mode: TradingMode,
    pub safe_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ShutdownData {
    pub reason: String,
    pub uptime: Duration,
    pub session_trades: u64,
    pub session_profit: f64,
}

#[derive(Debug, Clone)]
pub struct ConnectionData {
    pub connected: bool,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ErrorData {
    pub component: String,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageData {
    pub title: String,
    pub body: String,
}

/// Event payload
#[derive(Debug, Clone)]
pub enum EventData {
    Startup(StartupData),
    Shutdown(ShutdownData),
    Connection(ConnectionData),
    Error(ErrorData),
    Message(MessageData),
}

/// Notification event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: EventData,
}

impl Event {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn startup(data: StartupData) -> Self {
        Self::new(EventType::Startup, EventData::Startup(data))
    }

    pub fn shutdown(data: ShutdownData) -> Self {
        Self::new(EventType::Shutdown, EventData::Shutdown(data))
    }

    pub fn connection(data: ConnectionData) -> Self {
        Self::new(EventType::Connection, EventData::Connection(data))
    }

    pub fn error(data: ErrorData) -> Self {
        Self::new(EventType::Error, EventData::Error(data))
    }

    pub fn message(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(
            EventType::Message,
            EventData::Message(MessageData {
                title: title.into(),
                body: body.into(),
            }),
        )
    }

    /// Short headline.
    pub fn title(&self) -> String {
        match &self.data {
            EventData::Startup(_) => "Bot Started".to_string(),
            EventData::Shutdown(_) => "Bot Stopped".to_string(),
            EventData::Connection(d) if d.connected => "Backend Connected".to_string(),
            EventData::Connection(_) => "Backend Offline".to_string(),
            EventData::Error(d) => format!("Error in {}", d.component),
            EventData::Message(d) => d.title.clone(),
        }
    }

    /// Plain-text body, one fact per line.
    pub fn body(&self) -> String {
        match &self.data {
            EventData::Startup(d) => format_startup(d),
            EventData::Shutdown(d) => format_shutdown(d),
            EventData::Connection(d) => format_connection(d),
            EventData::Error(d) => format_error(d),
            EventData::Message(d) => d.body.clone(),
        }
    }
}

/// Trait for sending notifications
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send and wait for delivery
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;

    /// Queue without waiting
    fn send_async(&self, event: Event);

    /// Whether this notifier handles the event type
    fn is_enabled(&self, event_type: EventType) -> bool;

    async fn close(&self) -> Result<(), NotificationError>;
}

/// Notification error
#[derive(Debug, Clone)]
pub struct NotificationError {
    pub message: String,
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationError: {}", self.message)
    }
}

impl std::error::Error for NotificationError {}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Desktop notifications rendered through the log stream of the terminal
/// client.
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn show(&self, event: &Event) {
        info!(
            target: "desktop",
            kind = %event.event_type,
            title = %event.title(),
            body = %event.body(),
            "notification"
        );
    }
}

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        if self.is_enabled(event.event_type) {
            self.show(event);
        }
        Ok(())
    }

    fn send_async(&self, event: Event) {
        if self.is_enabled(event.event_type) {
            self.show(&event);
        }
    }

    fn is_enabled(&self, _event_type: EventType) -> bool {
        self.enabled
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// MultiNotifier fans out to several notifiers
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait::async_trait]
impl Notifier for MultiNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            if notifier.is_enabled(event.event_type) {
                if let Err(e) = notifier.send(event).await {
                    errors.push(e.message);
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::new(errors.join("; ")))
        }
    }

    fn send_async(&self, event: Event) {
        for notifier in &self.notifiers {
            if notifier.is_enabled(event.event_type) {
                notifier.send_async(event.clone());
            }
        }
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        self.notifiers.iter().any(|n| n.is_enabled(event_type))
    }

    async fn close(&self) -> Result<(), NotificationError> {
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            if let Err(e) = notifier.close().await {
                errors.push(e.message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::new(errors.join("; ")))
        }
    }
}

// === Formatting ===

fn mode_label(mode: TradingMode) -> &'static str {
    match mode {
        TradingMode::Simulation => "🧪 SIMULATION",
        TradingMode::Live => "🚀 LIVE",
    }
}

/// Formats a bot start
pub fn format_startup(data: &StartupData) -> String {
    let safe = if data.safe_mode { "on" } else { "off" };
    format!("Mode: {}\nSafe mode: {}", mode_label(data.mode), safe)
}

/// Formats a bot stop
pub fn format_shutdown(data: &ShutdownData) -> String {
    format!(
        "Reason: {}\n\
         Uptime: {}\n\
         Session trades: {}\n\
         Session profit: ${:.2}",
        data.reason,
        format_duration(data.uptime),
        add_thousand_separators(data.session_trades),
        data.session_profit
    )
}

/// Formats a connection change
pub fn format_connection(data: &ConnectionData) -> String {
    if data.connected {
        format!("Connected to {}", data.url)
    } else {
        format!("Lost connection to {}", data.url)
    }
}

/// Formats an error
pub fn format_error(data: &ErrorData) -> String {
    let error_str = data
        .error
        .as_ref()
        .map(|e| format!("\nError: {}", e))
        .unwrap_or_default();

    format!("Component: {}\nMessage: {}{}", data.component, data.message, error_str)
}

fn icon(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Startup => "🤖",
        EventType::Shutdown => "🛑",
        EventType::Connection => "🔌",
        EventType::Error => "⚠️",
        EventType::Message => "🔔",
    }
}

/// Formats an event as a Markdown message
pub fn format_event(event: &Event) -> String {
    format!(
        "{} *{}*\n\n{}\n\n⏰ {}",
        icon(event.event_type),
        event.title(),
        event.body(),
        event.timestamp.format("%H:%M:%S UTC")
    )
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
