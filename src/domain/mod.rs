//! Domain models shared by the backend protocol, state and views.

mod log;
mod opportunity;
mod outcome;
mod status;

pub use log::{LogEntry, LogLevel};
pub use opportunity::ArbitrageOpportunity;
pub use outcome::{CommandOutcome, Toggled};
pub use status::{BotStatus, LocalBotState, SessionData, TradingMode, uptime_since};
