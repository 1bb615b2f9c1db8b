//! Trading settings: the flat key=value document the backend reads.
//!
//! The document is owned by the user; rewrites keep comments, blank lines,
//! unrelated keys and inline comments exactly where they were.

pub mod document;
mod error;
mod store;

pub use document::ParsedSettings;
pub use error::SettingsError;
pub use store::{SettingsFile, SettingsStore};

use serde::{Deserialize, Serialize};

use crate::domain::TradingMode;

/// Kind of value a setting holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Number,
}

/// Recognized settings keys, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    SimulationMode,
    FlashLoanEnabled,
    SafeMode,
    ExecutionMode,
    MinProfitPct,
    MaxProfitPct,
    PositionSizeUsd,
    MinLiquidityUsd,
    MaxSlippage,
    BaseGasPriceGwei,
    MevProtectionCostUsd,
    MinProfitThresholdUsd,
    FlashLoanAmountUsd,
}

impl SettingKey {
    pub const ALL: [SettingKey; 13] = [
        SettingKey::SimulationMode,
        SettingKey::FlashLoanEnabled,
        SettingKey::SafeMode,
        SettingKey::ExecutionMode,
        SettingKey::MinProfitPct,
        SettingKey::MaxProfitPct,
        SettingKey::PositionSizeUsd,
        SettingKey::MinLiquidityUsd,
        SettingKey::MaxSlippage,
        SettingKey::BaseGasPriceGwei,
        SettingKey::MevProtectionCostUsd,
        SettingKey::MinProfitThresholdUsd,
        SettingKey::FlashLoanAmountUsd,
    ];

    /// Name as written in the document and on the wire.
    pub fn name(self) -> &'static str {
        match self {
            SettingKey::SimulationMode => "SIMULATION_MODE",
            SettingKey::FlashLoanEnabled => "FLASH_LOAN_ENABLED",
            SettingKey::SafeMode => "SAFE_MODE",
            SettingKey::ExecutionMode => "EXECUTION_MODE",
            SettingKey::MinProfitPct => "MIN_PROFIT_PCT",
            SettingKey::MaxProfitPct => "MAX_PROFIT_PCT",
            SettingKey::PositionSizeUsd => "POSITION_SIZE_USD",
            SettingKey::MinLiquidityUsd => "MIN_LIQUIDITY_USD",
            SettingKey::MaxSlippage => "MAX_SLIPPAGE",
            SettingKey::BaseGasPriceGwei => "BASE_GAS_PRICE_GWEI",
            SettingKey::MevProtectionCostUsd => "MEV_PROTECTION_COST_USD",
            SettingKey::MinProfitThresholdUsd => "MIN_PROFIT_THRESHOLD_USD",
            SettingKey::FlashLoanAmountUsd => "FLASH_LOAN_AMOUNT_USD",
        }
    }

    pub fn kind(self) -> SettingKind {
        match self {
            SettingKey::SimulationMode
            | SettingKey::FlashLoanEnabled
            | SettingKey::SafeMode
            | SettingKey::ExecutionMode => SettingKind::Bool,
            _ => SettingKind::Number,
        }
    }

    /// Human label used by the settings form.
    pub fn label(self) -> &'static str {
        match self {
            SettingKey::SimulationMode => "Simulation Mode",
            SettingKey::FlashLoanEnabled => "Flash Loan Enabled",
            SettingKey::SafeMode => "Safe Mode",
            SettingKey::ExecutionMode => "Execution Mode",
            SettingKey::MinProfitPct => "Min Profit",
            SettingKey::MaxProfitPct => "Max Profit",
            SettingKey::PositionSizeUsd => "Position Size",
            SettingKey::MinLiquidityUsd => "Min Liquidity",
            SettingKey::MaxSlippage => "Max Slippage",
            SettingKey::BaseGasPriceGwei => "Base Gas Price",
            SettingKey::MevProtectionCostUsd => "MEV Protection Cost",
            SettingKey::MinProfitThresholdUsd => "Min Profit Threshold",
            SettingKey::FlashLoanAmountUsd => "Flash Loan Amount",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SettingKey::MinProfitPct | SettingKey::MaxProfitPct => "%",
            SettingKey::BaseGasPriceGwei => "gwei",
            SettingKey::MaxSlippage => "",
            SettingKey::PositionSizeUsd
            | SettingKey::MinLiquidityUsd
            | SettingKey::MevProtectionCostUsd
            | SettingKey::MinProfitThresholdUsd
            | SettingKey::FlashLoanAmountUsd => "USD",
            _ => "",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SettingKey::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SettingsError::UnknownKey(wanted.to_string()))
    }
}

/// A typed setting value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Parses a raw document value for the given key.
///
/// Booleans follow the document convention: only a case-insensitive `true`
/// is true, anything else is false.
pub fn parse_value(key: SettingKey, raw: &str) -> Result<SettingValue, SettingsError> {
    let raw = raw.trim();
    match key.kind() {
        SettingKind::Bool => Ok(SettingValue::Bool(raw.eq_ignore_ascii_case("true"))),
        SettingKind::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(SettingValue::Number)
            .ok_or_else(|| SettingsError::InvalidValue {
                key: key.name().to_string(),
                value: raw.to_string(),
            }),
    }
}

/// Flat record of trading parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct SettingsData {
    pub simulation_mode: bool,
    pub flash_loan_enabled: bool,
    pub safe_mode: bool,
    pub execution_mode: bool,
    pub min_profit_pct: f64,
    pub max_profit_pct: f64,
    pub position_size_usd: f64,
    pub min_liquidity_usd: f64,
    pub max_slippage: f64,
    pub base_gas_price_gwei: f64,
    pub mev_protection_cost_usd: f64,
    pub min_profit_threshold_usd: f64,
    pub flash_loan_amount_usd: f64,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            simulation_mode: true,
            flash_loan_enabled: false,
            safe_mode: true,
            execution_mode: false,
            min_profit_pct: 1.0,
            max_profit_pct: 20.0,
            position_size_usd: 5.0,
            min_liquidity_usd: 100_000.0,
            max_slippage: 0.01,
            base_gas_price_gwei: 1_000_000.0,
            mev_protection_cost_usd: 1.0,
            min_profit_threshold_usd: 0.50,
            flash_loan_amount_usd: 100_000.0,
        }
    }
}

impl SettingsData {
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::SimulationMode => SettingValue::Bool(self.simulation_mode),
            SettingKey::FlashLoanEnabled => SettingValue::Bool(self.flash_loan_enabled),
            SettingKey::SafeMode => SettingValue::Bool(self.safe_mode),
            SettingKey::ExecutionMode => SettingValue::Bool(self.execution_mode),
            SettingKey::MinProfitPct => SettingValue::Number(self.min_profit_pct),
            SettingKey::MaxProfitPct => SettingValue::Number(self.max_profit_pct),
            SettingKey::PositionSizeUsd => SettingValue::Number(self.position_size_usd),
            SettingKey::MinLiquidityUsd => SettingValue::Number(self.min_liquidity_usd),
            SettingKey::MaxSlippage => SettingValue::Number(self.max_slippage),
            SettingKey::BaseGasPriceGwei => SettingValue::Number(self.base_gas_price_gwei),
            SettingKey::MevProtectionCostUsd => SettingValue::Number(self.mev_protection_cost_usd),
            SettingKey::MinProfitThresholdUsd => {
                SettingValue::Number(self.min_profit_threshold_usd)
            }
            SettingKey::FlashLoanAmountUsd => SettingValue::Number(self.flash_loan_amount_usd),
        }
    }

    /// Sets a value. SIMULATION_MODE and EXECUTION_MODE move together.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError> {
        match (key, value) {
            (SettingKey::SimulationMode, SettingValue::Bool(b)) => self.set_simulation_mode(b),
            (SettingKey::ExecutionMode, SettingValue::Bool(b)) => self.set_simulation_mode(!b),
            (_, SettingValue::Bool(b)) if key.kind() == SettingKind::Bool => {
                self.set_field(key, SettingValue::Bool(b))
            }
            (_, SettingValue::Number(n)) if key.kind() == SettingKind::Number => {
                if !n.is_finite() {
                    return Err(SettingsError::InvalidValue {
                        key: key.name().to_string(),
                        value: n.to_string(),
                    });
                }
                self.set_field(key, SettingValue::Number(n))
            }
            _ => {
                return Err(SettingsError::TypeMismatch {
                    key: key.name().to_string(),
                    expected: match key.kind() {
                        SettingKind::Bool => "boolean",
                        SettingKind::Number => "numeric",
                    },
                });
            }
        }
        Ok(())
    }

    /// Parses `raw` for `key` and sets it.
    pub fn set_from_str(&mut self, key: SettingKey, raw: &str) -> Result<(), SettingsError> {
        let value = parse_value(key, raw)?;
        self.set(key, value)
    }

    /// Assigns a single field with no cross-field rules.
    pub(crate) fn set_field(&mut self, key: SettingKey, value: SettingValue) {
        match (key, value) {
            (SettingKey::SimulationMode, SettingValue::Bool(b)) => self.simulation_mode = b,
            (SettingKey::FlashLoanEnabled, SettingValue::Bool(b)) => self.flash_loan_enabled = b,
            (SettingKey::SafeMode, SettingValue::Bool(b)) => self.safe_mode = b,
            (SettingKey::ExecutionMode, SettingValue::Bool(b)) => self.execution_mode = b,
            (SettingKey::MinProfitPct, SettingValue::Number(n)) => self.min_profit_pct = n,
            (SettingKey::MaxProfitPct, SettingValue::Number(n)) => self.max_profit_pct = n,
            (SettingKey::PositionSizeUsd, SettingValue::Number(n)) => self.position_size_usd = n,
            (SettingKey::MinLiquidityUsd, SettingValue::Number(n)) => self.min_liquidity_usd = n,
            (SettingKey::MaxSlippage, SettingValue::Number(n)) => self.max_slippage = n,
            (SettingKey::BaseGasPriceGwei, SettingValue::Number(n)) => {
                self.base_gas_price_gwei = n
            }
            (SettingKey::MevProtectionCostUsd, SettingValue::Number(n)) => {
                self.mev_protection_cost_usd = n
            }
            (SettingKey::MinProfitThresholdUsd, SettingValue::Number(n)) => {
                self.min_profit_threshold_usd = n
            }
            (SettingKey::FlashLoanAmountUsd, SettingValue::Number(n)) => {
                self.flash_loan_amount_usd = n
            }
            _ => {}
        }
    }

    pub fn set_simulation_mode(&mut self, simulation: bool) {
        self.simulation_mode = simulation;
        self.execution_mode = !simulation;
    }

    /// Current trading mode; SIMULATION_MODE=false means live.
    pub fn mode(&self) -> TradingMode {
        TradingMode::from_simulation_flag(self.simulation_mode)
    }

    /// Flips between simulation and live, returning the new mode.
    pub fn toggle_mode(&mut self) -> TradingMode {
        self.set_simulation_mode(!self.simulation_mode);
        self.mode()
    }

    /// Flips safe mode, returning the new value.
    pub fn toggle_safe_mode(&mut self) -> bool {
        self.safe_mode = !self.safe_mode;
        self.safe_mode
    }

    /// EXECUTION_MODE realigned as the negation of SIMULATION_MODE.
    pub fn normalized(mut self) -> Self {
        self.set_simulation_mode(self.simulation_mode);
        self
    }

    /// True when the two mode flags agree with each other.
    pub fn modes_consistent(&self) -> bool {
        self.simulation_mode != self.execution_mode
    }
}
