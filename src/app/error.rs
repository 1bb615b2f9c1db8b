//! Application error types.

use thiserror::Error;

use crate::backend::{BackendError, HostError};
use crate::config::ConfigError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("{0}")]
    Settings(#[from] SettingsError),

    /// A control was used while unavailable.
    #[error("{0}")]
    Blocked(&'static str),

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
