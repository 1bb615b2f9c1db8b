//! Structured results for user-initiated commands.

use serde::{Deserialize, Serialize};

/// Result of a command shown to the user; failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of a toggle. `value` is the new setting, present only on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Toggled<T> {
    pub outcome: CommandOutcome,
    pub value: Option<T>,
}

impl<T> Toggled<T> {
    pub fn ok(message: impl Into<String>, value: T) -> Self {
        Self {
            outcome: CommandOutcome::ok(message),
            value: Some(value),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: CommandOutcome::failed(message),
            value: None,
        }
    }
}
