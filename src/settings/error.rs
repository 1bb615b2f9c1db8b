//! Settings error types.

use std::path::PathBuf;

/// Settings document error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file not found: {0}")]
    NotFound(PathBuf),
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings unavailable: {0}")]
    Unavailable(String),
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("{key} expects a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
