//! Editable copy of the settings with per-field numeric drafts.

use serde::Serialize;

use crate::settings::{SettingKey, SettingKind, SettingValue, SettingsData, SettingsError};

/// Text input for a numeric setting.
///
/// Keystrokes only change `text`. The parsed value moves on commit (Enter or
/// blur); an unparseable draft snaps back to the last committed value.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericInput {
    key: SettingKey,
    text: String,
    value: f64,
    editing: bool,
}

impl NumericInput {
    pub fn new(key: SettingKey, value: f64) -> Self {
        Self {
            key,
            text: value.to_string(),
            value,
            editing: false,
        }
    }

    pub fn key(&self) -> SettingKey {
        self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.editing = true;
    }

    /// Parses the draft. Returns the new value, or None when the draft was
    /// rejected and reverted.
    pub fn commit(&mut self) -> Option<f64> {
        self.editing = false;
        match self.text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {
                self.value = v;
                self.text = v.to_string();
                Some(v)
            }
            _ => {
                self.text = self.value.to_string();
                None
            }
        }
    }

    /// Replaces the value from outside. A draft in progress keeps its text.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        if !self.editing {
            self.text = value.to_string();
        }
    }
}

/// One line of the rendered form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRow {
    pub key: String,
    pub label: String,
    pub value: String,
    pub unit: String,
    pub editing: bool,
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct SettingsForm {
    saved: SettingsData,
    draft: SettingsData,
    inputs: Vec<NumericInput>,
    focused: Option<SettingKey>,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::new(SettingsData::default())
    }
}

impl SettingsForm {
    pub fn new(settings: SettingsData) -> Self {
        let inputs = numeric_inputs(&settings);
        Self {
            saved: settings.clone(),
            draft: settings,
            inputs,
            focused: None,
        }
    }

    /// Replaces both the saved and draft copies, dropping pending edits.
    pub fn load(&mut self, settings: SettingsData) {
        *self = Self::new(settings);
    }

    pub fn saved(&self) -> &SettingsData {
        &self.saved
    }

    pub fn draft(&self) -> &SettingsData {
        &self.draft
    }

    pub fn focused(&self) -> Option<SettingKey> {
        self.focused
    }

    pub fn input(&self, key: SettingKey) -> Option<&NumericInput> {
        self.inputs.iter().find(|i| i.key == key)
    }

    fn input_mut(&mut self, key: SettingKey) -> Result<&mut NumericInput, SettingsError> {
        self.inputs
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| SettingsError::TypeMismatch {
                key: key.name().to_string(),
                expected: "numeric",
            })
    }

    /// Flips a boolean switch and returns its new value.
    pub fn toggle(&mut self, key: SettingKey) -> Result<bool, SettingsError> {
        let SettingValue::Bool(current) = self.draft.get(key) else {
            return Err(SettingsError::TypeMismatch {
                key: key.name().to_string(),
                expected: "boolean",
            });
        };
        self.blur();
        self.draft.set(key, SettingValue::Bool(!current))?;
        Ok(!current)
    }

    /// Sets a value in one step, as if typed and committed.
    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<(), SettingsError> {
        match key.kind() {
            SettingKind::Bool => {
                self.blur();
                self.draft.set_from_str(key, raw)
            }
            SettingKind::Number => {
                self.edit(key, raw)?;
                match self.commit(key)? {
                    Some(_) => Ok(()),
                    None => Err(SettingsError::InvalidValue {
                        key: key.name().to_string(),
                        value: raw.trim().to_string(),
                    }),
                }
            }
        }
    }

    /// Types into a numeric field. Moving focus commits the previous field.
    pub fn edit(&mut self, key: SettingKey, text: &str) -> Result<(), SettingsError> {
        self.input_mut(key)?;
        if self.focused != Some(key) {
            self.blur();
        }
        self.input_mut(key)?.edit(text);
        self.focused = Some(key);
        Ok(())
    }

    /// Enter on a numeric field.
    pub fn commit(&mut self, key: SettingKey) -> Result<Option<f64>, SettingsError> {
        let committed = self.input_mut(key)?.commit();
        if let Some(value) = committed {
            self.draft.set(key, SettingValue::Number(value))?;
        }
        if self.focused == Some(key) {
            self.focused = None;
        }
        Ok(committed)
    }

    /// Commits whichever field has focus.
    pub fn blur(&mut self) {
        if let Some(key) = self.focused.take() {
            if let Ok(Some(value)) = self.input_mut(key).map(NumericInput::commit) {
                // Numeric keys carry no cross-field rules, so this cannot fail.
                let _ = self.draft.set(key, SettingValue::Number(value));
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved || self.inputs.iter().any(NumericInput::is_editing)
    }

    /// Discards every change since the last load or save.
    pub fn reset(&mut self) {
        let saved = self.saved.clone();
        self.load(saved);
    }

    /// Commits the focused field and returns the values to save.
    pub fn values(&mut self) -> SettingsData {
        self.blur();
        self.draft.clone()
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.draft.clone();
    }

    pub fn rows(&self) -> Vec<SettingRow> {
        SettingKey::ALL
            .iter()
            .map(|&key| {
                let (value, editing) = match (self.draft.get(key), self.input(key)) {
                    (SettingValue::Bool(b), _) => ((if b { "ON" } else { "OFF" }).to_string(), false),
                    (SettingValue::Number(_), Some(input)) => {
                        (input.text().to_string(), input.is_editing())
                    }
                    (SettingValue::Number(n), None) => (n.to_string(), false),
                };
                SettingRow {
                    key: key.name().to_string(),
                    label: key.label().to_string(),
                    value,
                    unit: key.unit().to_string(),
                    editing,
                    changed: self.draft.get(key) != self.saved.get(key),
                }
            })
            .collect()
    }
}

fn numeric_inputs(settings: &SettingsData) -> Vec<NumericInput> {
    SettingKey::ALL
        .iter()
        .filter_map(|&key| match settings.get(key) {
            SettingValue::Number(n) => Some(NumericInput::new(key, n)),
            SettingValue::Bool(_) => None,
        })
        .collect()
}

pub fn render(form: &SettingsForm) -> String {
    let mut out = String::from("Settings\n");
    for row in form.rows() {
        let marker = if row.editing {
            '>'
        } else if row.changed {
            '*'
        } else {
            ' '
        };
        let unit = if row.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", row.unit)
        };
        out.push_str(&format!(
            " {} {:<22} {}{}  ({})\n",
            marker, row.label, row.value, unit, row.key
        ));
    }
    if form.is_dirty() {
        out.push_str("  Unsaved changes. Use `save` or `reset`.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_does_not_touch_value_until_commit() {
        let mut form = SettingsForm::default();

        form.edit(SettingKey::MinProfitPct, "2.").unwrap();
        assert_eq!(form.draft().min_profit_pct, 1.0);
        assert_eq!(form.input(SettingKey::MinProfitPct).unwrap().text(), "2.");
        assert!(form.is_dirty());

        form.edit(SettingKey::MinProfitPct, "2.5").unwrap();
        assert_eq!(form.commit(SettingKey::MinProfitPct).unwrap(), Some(2.5));
        assert_eq!(form.draft().min_profit_pct, 2.5);
        assert_eq!(form.focused(), None);
    }

    #[test]
    fn test_invalid_draft_reverts() {
        let mut form = SettingsForm::default();

        form.edit(SettingKey::MaxSlippage, "abc").unwrap();
        assert_eq!(form.commit(SettingKey::MaxSlippage).unwrap(), None);

        let input = form.input(SettingKey::MaxSlippage).unwrap();
        assert_eq!(input.text(), "0.01");
        assert_eq!(form.draft().max_slippage, 0.01);
        assert!(!form.is_dirty());
    }

    #[test]
    fn test_moving_focus_commits_previous_field() {
        let mut form = SettingsForm::default();

        form.edit(SettingKey::PositionSizeUsd, "10").unwrap();
        form.edit(SettingKey::MaxProfitPct, "15").unwrap();

        assert_eq!(form.draft().position_size_usd, 10.0);
        assert_eq!(form.draft().max_profit_pct, 20.0);
        assert_eq!(form.focused(), Some(SettingKey::MaxProfitPct));
    }

    #[test]
    fn test_toggle_keeps_modes_complementary() {
        let mut form = SettingsForm::default();

        assert!(form.toggle(SettingKey::ExecutionMode).unwrap());
        assert!(!form.draft().simulation_mode);
        assert!(form.draft().modes_consistent());

        assert!(form.toggle(SettingKey::SimulationMode).unwrap());
        assert!(!form.draft().execution_mode);
    }

    #[test]
    fn test_toggle_rejects_numeric_keys() {
        let mut form = SettingsForm::default();
        assert!(form.toggle(SettingKey::MaxSlippage).is_err());
        assert!(form.edit(SettingKey::SafeMode, "1").is_err());
    }

    #[test]
    fn test_set_numeric_rejects_garbage() {
        let mut form = SettingsForm::default();
        assert!(form.set(SettingKey::BaseGasPriceGwei, "fast").is_err());
        assert_eq!(form.draft().base_gas_price_gwei, 1_000_000.0);

        form.set(SettingKey::BaseGasPriceGwei, "30").unwrap();
        assert_eq!(form.draft().base_gas_price_gwei, 30.0);
    }

    #[test]
    fn test_reset_and_mark_saved() {
        let mut form = SettingsForm::default();
        form.toggle(SettingKey::FlashLoanEnabled).unwrap();
        form.edit(SettingKey::MinLiquidityUsd, "5000").unwrap();

        form.reset();
        assert!(!form.is_dirty());
        assert!(!form.draft().flash_loan_enabled);

        form.edit(SettingKey::MinLiquidityUsd, "5000").unwrap();
        let values = form.values();
        assert_eq!(values.min_liquidity_usd, 5000.0);
        form.mark_saved();
        assert!(!form.is_dirty());
    }

    #[test]
    fn test_external_value_keeps_draft_text() {
        let mut input = NumericInput::new(SettingKey::MinProfitPct, 1.0);
        input.edit("3");
        input.set_value(2.0);
        assert_eq!(input.text(), "3");
        assert_eq!(input.value(), 2.0);
    }

    #[test]
    fn test_rows_mark_changes() {
        let mut form = SettingsForm::default();
        form.toggle(SettingKey::SafeMode).unwrap();

        let rows = form.rows();
        assert_eq!(rows.len(), SettingKey::ALL.len());
        let safe = rows.iter().find(|r| r.key == "SAFE_MODE").unwrap();
        assert_eq!(safe.value, "OFF");
        assert!(safe.changed);
        assert!(render(&form).contains("Unsaved changes"));
    }
}
