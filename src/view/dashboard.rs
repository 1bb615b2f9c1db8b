//! Home tab: stat cards and the best opportunities.

use serde::Serialize;

use crate::format::{add_thousand_separators, format_usd};
use crate::state::{AppState, EffectiveStatus};

pub const TOP_OPPORTUNITIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopOpportunity {
    pub pair: String,
    pub route: String,
    pub profit_pct: String,
    pub profit_usd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub cards: [StatCard; 4],
    pub top: Vec<TopOpportunity>,
    /// Scan counters from the monitoring stats file, when one was found.
    pub monitoring: Option<String>,
}

pub fn dashboard(state: &AppState, effective: &EffectiveStatus) -> Dashboard {
    let top: Vec<_> = state
        .opportunities
        .top_by(TOP_OPPORTUNITIES, |o| o.profit_pct);

    let best = top
        .first()
        .map(|o| format!("{:.2}%", o.profit_pct))
        .unwrap_or_else(|| "0%".to_string());

    let cards = [
        StatCard {
            label: "Total Profit",
            value: format_usd(effective.status.total_profit),
        },
        StatCard {
            label: "Total Trades",
            value: add_thousand_separators(effective.status.total_trades),
        },
        StatCard {
            label: "Opportunities",
            value: state.opportunities.len().to_string(),
        },
        StatCard {
            label: "Best Profit",
            value: best,
        },
    ];

    let top = top
        .into_iter()
        .map(|o| TopOpportunity {
            pair: o.pair.clone(),
            route: format!("{} → {}", o.buy_dex, o.sell_dex),
            profit_pct: format!("{:.2}%", o.profit_pct),
            profit_usd: format_usd(o.profit_usd),
        })
        .collect();

    let monitoring = state.stats.as_ref().map(|s| {
        format!(
            "Scans {} | Found {} | Executed {} | Profit {}",
            add_thousand_separators(s.scans),
            add_thousand_separators(s.opportunities_found),
            add_thousand_separators(s.trades_executed),
            format_usd(s.total_profit_usd)
        )
    });

    Dashboard {
        cards,
        top,
        monitoring,
    }
}

pub fn render(dashboard: &Dashboard) -> String {
    let cards: Vec<String> = dashboard
        .cards
        .iter()
        .map(|c| format!("{}: {}", c.label, c.value))
        .collect();
    let mut out = format!("{}\n", cards.join(" | "));

    if let Some(monitoring) = &dashboard.monitoring {
        out.push_str(&format!("{}\n", monitoring));
    }

    out.push_str("Top Opportunities\n");
    if dashboard.top.is_empty() {
        out.push_str("  Waiting for opportunities...\n");
    }
    for o in &dashboard.top {
        out.push_str(&format!(
            "  {:<12} {:<28} {:>8} {:>10}\n",
            o.pair, o.route, o.profit_pct, o.profit_usd
        ));
    }
    out
}
