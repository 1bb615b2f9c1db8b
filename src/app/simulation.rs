//! Mock opportunity feed for simulation mode without a backend feed.

use chrono::{DateTime, Utc};

use crate::domain::ArbitrageOpportunity;

const PAIRS: [&str; 3] = ["WETH/USDC", "WETH/weETH", "USDC/weETH"];
const DEXES: [&str; 3] = ["Uniswap", "Aerodrome", "SushiSwap"];

/// Deterministic generator: the same seed yields the same sequence.
#[derive(Debug, Clone)]
pub struct MockOpportunities {
    seed: u64,
    seq: u64,
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Maps the next draw onto `[lo, hi)`.
fn uniform(draw: u64, lo: f64, hi: f64) -> f64 {
    let unit = (draw >> 11) as f64 / (1u64 << 53) as f64;
    lo + unit * (hi - lo)
}

impl MockOpportunities {
    pub fn new(seed: u64) -> Self {
        Self { seed, seq: 0 }
    }

    fn draw(&mut self) -> u64 {
        self.seq += 1;
        splitmix64(self.seed ^ self.seq.wrapping_mul(0x2545_f491_4f6c_dd1d))
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> ArbitrageOpportunity {
        let id_seq = self.seq;
        let pair = PAIRS[(self.draw() % PAIRS.len() as u64) as usize];
        let buy = (self.draw() % DEXES.len() as u64) as usize;
        let sell = (buy + 1 + (self.draw() % (DEXES.len() as u64 - 1)) as usize) % DEXES.len();

        let profit_pct = uniform(self.draw(), 0.1, 5.0);
        let profit_usd = uniform(self.draw(), 1.0, 50.0);
        let buy_price = uniform(self.draw(), 0.998, 1.002);
        let sell_price = buy_price * (1.0 + profit_pct / 100.0);
        let volume = (10_000 + self.draw() % 90_001) as f64;

        ArbitrageOpportunity {
            id: format!("sim_{}_{}", id_seq, now.timestamp()),
            pair: pair.to_string(),
            buy_dex: DEXES[buy].to_string(),
            sell_dex: DEXES[sell].to_string(),
            buy_price,
            sell_price,
            profit_pct,
            profit_usd,
            volume,
            timestamp: now.timestamp_millis(),
        }
    }
}
