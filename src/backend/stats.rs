//! Monitoring stats written by the backend to a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::HostError;

/// Snapshot of the backend's monitoring counters. Every field is optional on
/// disk; the backend writes snake_case, older builds wrote camelCase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringStats {
    #[serde(alias = "totalScans", alias = "total_scans")]
    pub scans: u64,
    #[serde(alias = "opportunitiesFound")]
    pub opportunities_found: u64,
    #[serde(alias = "tradesExecuted")]
    pub trades_executed: u64,
    #[serde(alias = "totalProfitUsd", alias = "totalProfit", alias = "total_profit")]
    pub total_profit_usd: f64,
    #[serde(alias = "lastUpdate")]
    pub last_update: Option<String>,
}

/// Finds the stats file across a fixed list of base directories.
#[derive(Debug, Clone)]
pub struct StatsLocator {
    file_name: String,
    dirs: Vec<PathBuf>,
}

impl StatsLocator {
    /// Search order: configured dirs, the current directory, its parent, the
    /// executable's directory.
    pub fn new(file_name: impl Into<String>, configured: &[String]) -> Self {
        let mut dirs: Vec<PathBuf> = configured.iter().map(PathBuf::from).collect();
        dirs.push(PathBuf::from("."));
        dirs.push(PathBuf::from(".."));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            dirs.push(exe_dir);
        }
        Self::with_dirs(file_name, dirs)
    }

    /// Exactly the given directories, in order.
    pub fn with_dirs(file_name: impl Into<String>, dirs: Vec<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            dirs,
        }
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        self.dirs.iter().map(|dir| dir.join(&self.file_name)).collect()
    }

    /// First candidate that reads and parses.
    pub async fn load(&self) -> Result<MonitoringStats, HostError> {
        let candidates = self.candidates();
        for path in &candidates {
            let content = match fs::read_to_string(path).await {
                Ok(content) => content,
                Err(_) => continue,
            };
            match serde_json::from_str::<MonitoringStats>(&content) {
                Ok(stats) => {
                    debug!(path = %path.display(), "monitoring stats loaded");
                    return Ok(stats);
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unparseable stats file");
                }
            }
        }
        Err(HostError::StatsNotFound(candidates))
    }
}
