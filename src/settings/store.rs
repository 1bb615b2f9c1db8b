//! File-backed settings store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{SettingsData, SettingsError, document};
use crate::domain::{CommandOutcome, Toggled, TradingMode};

/// Raw access to a settings document plus the read-modify-write operations
/// built on it.
///
/// Only [`SettingsError::NotFound`] means "no document yet". Any other read
/// failure aborts a write, so a document that exists but cannot be read is
/// never replaced by the template.
#[async_trait]
pub trait SettingsFile: Send + Sync {
    async fn read_raw(&self) -> Result<String, SettingsError>;
    async fn write_raw(&self, content: &str) -> Result<(), SettingsError>;

    /// Strict load. A missing document yields the defaults.
    async fn try_load(&self) -> Result<SettingsData, SettingsError> {
        match self.read_raw().await {
            Ok(content) => Ok(document::parse_logged(&content)),
            Err(SettingsError::NotFound(_)) => Ok(SettingsData::default()),
            Err(e) => Err(e),
        }
    }

    /// Loads settings, falling back to defaults on any failure.
    async fn load(&self) -> SettingsData {
        match self.try_load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "failed to load settings, using defaults");
                SettingsData::default()
            }
        }
    }

    /// Saves settings, preserving the existing document layout.
    async fn save(&self, settings: &SettingsData) -> CommandOutcome {
        let existing = match self.read_raw().await {
            Ok(content) => Some(content),
            Err(SettingsError::NotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, "existing settings unreadable, leaving them untouched");
                return CommandOutcome::failed(format!("Failed to save settings: {}", e));
            }
        };

        let content = document::format(settings, existing.as_deref());

        match self.write_raw(&content).await {
            Ok(()) => {
                info!("settings saved");
                CommandOutcome::ok("Settings saved successfully")
            }
            Err(e) => {
                warn!(error = %e, "failed to save settings");
                CommandOutcome::failed(format!("Failed to save settings: {}", e))
            }
        }
    }

    /// Flips between simulation and live mode and persists the change.
    async fn toggle_mode(&self) -> Toggled<TradingMode> {
        let mut settings = match self.try_load().await {
            Ok(settings) => settings,
            Err(e) => return Toggled::failed(format!("Failed to switch mode: {}", e)),
        };
        let mode = settings.toggle_mode();

        let outcome = self.save(&settings).await;
        if outcome.success {
            Toggled::ok(format!("Switched to {} mode", mode), mode)
        } else {
            Toggled::failed(outcome.message)
        }
    }

    /// Flips safe mode and persists the change.
    async fn toggle_safe_mode(&self) -> Toggled<bool> {
        let mut settings = match self.try_load().await {
            Ok(settings) => settings,
            Err(e) => return Toggled::failed(format!("Failed to toggle safe mode: {}", e)),
        };
        let safe_mode = settings.toggle_safe_mode();

        let outcome = self.save(&settings).await;
        if outcome.success {
            let state = if safe_mode { "enabled" } else { "disabled" };
            Toggled::ok(format!("Safe mode {}", state), safe_mode)
        } else {
            Toggled::failed(outcome.message)
        }
    }
}

/// Reads and writes the settings document at a fixed path.
///
/// Access is read-then-write without locking; a single client window owns
/// the file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsFile for SettingsStore {
    async fn read_raw(&self) -> Result<String, SettingsError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SettingsError::NotFound(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the document, writing a sibling temp file and renaming it over
    /// the target so readers never see a half-written file.
    async fn write_raw(&self, content: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "settings".to_string());
        let tmp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&tmp_path, content).await?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = content.len(), "settings document written");
        Ok(())
    }
}
