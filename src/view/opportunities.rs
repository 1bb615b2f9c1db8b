//! Opportunity table: the best rows by profit percentage.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::domain::ArbitrageOpportunity;
use crate::format::format_usd;
use crate::state::{AppState, EffectiveStatus};

pub const TABLE_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityRow {
    /// 1-based position, the argument of `exec <n>`.
    pub index: usize,
    pub id: String,
    pub pair: String,
    pub buy: String,
    pub sell: String,
    pub profit_pct: String,
    pub profit_usd: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityTable {
    pub header: String,
    pub rows: Vec<OpportunityRow>,
    pub can_execute: bool,
    pub hint: Option<String>,
}

/// The opportunities shown in the table, best first.
pub fn ranked(state: &AppState) -> Vec<&ArbitrageOpportunity> {
    state.opportunities.top_by(TABLE_ROWS, |o| o.profit_pct)
}

/// The opportunity at 1-based table position `n`.
pub fn select(state: &AppState, n: usize) -> Option<ArbitrageOpportunity> {
    n.checked_sub(1)
        .and_then(|i| ranked(state).get(i).map(|o| (*o).clone()))
}

fn clock_time(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

pub fn table(state: &AppState, effective: &EffectiveStatus) -> OpportunityTable {
    let total = state.opportunities.len();
    let header = if total == 0 {
        "No arbitrage opportunities found".to_string()
    } else {
        format!("{} opportunities found", total)
    };

    let rows = ranked(state)
        .into_iter()
        .enumerate()
        .map(|(i, o)| OpportunityRow {
            index: i + 1,
            id: o.id.clone(),
            pair: o.pair.clone(),
            buy: format!("Buy: {}", o.buy_dex),
            sell: format!("Sell: {}", o.sell_dex),
            profit_pct: format!("{:.2}%", o.profit_pct),
            profit_usd: format!("{} profit", format_usd(o.profit_usd)),
            time: clock_time(o.timestamp),
        })
        .collect();

    let can_execute = effective.controls.execute_trade;
    OpportunityTable {
        header,
        rows,
        can_execute,
        hint: (!can_execute && total > 0)
            .then(|| "Bot must be running and connected to execute trades".to_string()),
    }
}

pub fn render(table: &OpportunityTable) -> String {
    let mut out = format!("Opportunities: {}\n", table.header);
    for row in &table.rows {
        out.push_str(&format!(
            " {:>2}. {:<12} {:<18} {:<18} {:>8}  {:<16} {}\n",
            row.index, row.pair, row.buy, row.sell, row.profit_pct, row.profit_usd, row.time
        ));
    }
    if table.can_execute && !table.rows.is_empty() {
        out.push_str("  Execute Trade: exec <n>\n");
    }
    if let Some(hint) = &table.hint {
        out.push_str(&format!("  {}\n", hint));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectivityPolicy;

    fn opportunity(id: &str, profit_pct: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            id: id.to_string(),
            pair: "WETH/USDC".to_string(),
            buy_dex: "Uniswap".to_string(),
            sell_dex: "SushiSwap".to_string(),
            buy_price: 1800.0,
            sell_price: 1810.0,
            profit_pct,
            profit_usd: profit_pct * 2.0,
            volume: 5000.0,
            timestamp: 1_700_000_000_000,
        }
    }

    fn state_with(count: usize) -> AppState {
        let mut state = AppState::new(ConnectivityPolicy::AllModes);
        for i in 0..count {
            state.push_opportunity(opportunity(&format!("o{}", i), i as f64 * 0.1));
        }
        state
    }

    #[test]
    fn test_table_shows_top_ten_by_profit() {
        let state = state_with(15);
        let table = table(&state, &state.effective(Utc::now()));

        assert_eq!(table.header, "15 opportunities found");
        assert_eq!(table.rows.len(), TABLE_ROWS);
        assert_eq!(table.rows[0].id, "o14");
        assert_eq!(table.rows[0].buy, "Buy: Uniswap");
        assert_eq!(table.rows[0].profit_pct, "1.40%");
        assert_eq!(table.rows[0].profit_usd, "$2.80 profit");
        assert!(!table.can_execute);
        assert!(table.hint.is_some());
    }

    #[test]
    fn test_empty_table() {
        let state = state_with(0);
        let table = table(&state, &state.effective(Utc::now()));
        assert_eq!(table.header, "No arbitrage opportunities found");
        assert!(table.hint.is_none());
    }

    #[test]
    fn test_select_is_one_based() {
        let state = state_with(3);
        assert_eq!(select(&state, 1).unwrap().id, "o2");
        assert_eq!(select(&state, 3).unwrap().id, "o0");
        assert!(select(&state, 0).is_none());
        assert!(select(&state, 4).is_none());
    }
}
