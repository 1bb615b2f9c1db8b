//! Timer configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Fixed-interval timers driving the main loop.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Monitoring stats poll (default: 5s).
    #[serde(default = "default_stats_interval", with = "duration")]
    pub stats_interval: Duration,
    /// Mock opportunity refresh while in simulation mode (default: 3s).
    #[serde(default = "default_opportunity_refresh", with = "duration")]
    pub opportunity_refresh: Duration,
    /// Reconciliation and redraw tick (default: 1s).
    #[serde(default = "default_reconcile_interval", with = "duration")]
    pub reconcile_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stats_interval: default_stats_interval(),
            opportunity_refresh: default_opportunity_refresh(),
            reconcile_interval: default_reconcile_interval(),
        }
    }
}

fn default_stats_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_opportunity_refresh() -> Duration {
    Duration::from_secs(3)
}

fn default_reconcile_interval() -> Duration {
    Duration::from_secs(1)
}
