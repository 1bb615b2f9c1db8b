//! Arbitrage opportunity as pushed by the backend.

use serde::{Deserialize, Serialize};

/// A read-only display record for one cross-DEX price gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageOpportunity {
    pub id: String,
    /// Trading pair (e.g., "WETH/USDC").
    pub pair: String,
    /// DEX to buy on.
    pub buy_dex: String,
    /// DEX to sell on.
    pub sell_dex: String,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Profit as a percentage of the position.
    pub profit_pct: f64,
    pub profit_usd: f64,
    /// Available volume in USD.
    #[serde(default)]
    pub volume: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}
