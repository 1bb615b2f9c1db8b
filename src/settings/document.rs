//! Line-oriented codec for the settings document.
//!
//! Format: `KEY=value` lines, `#` comments, optional quotes around values,
//! optional trailing `# comment` after a value. Unknown keys are not ours and
//! pass through untouched.

use std::collections::HashSet;

use tracing::warn;

use super::{SettingKey, SettingsData, parse_value};

/// Result of parsing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSettings {
    pub settings: SettingsData,
    /// Recognized keys whose value could not be parsed; they hold defaults.
    pub invalid_keys: Vec<SettingKey>,
    /// SIMULATION_MODE and EXECUTION_MODE disagreed and were realigned.
    pub modes_realigned: bool,
}

/// One `KEY=value` line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment<'a> {
    key: &'a str,
    value: String,
    /// Whitespace plus inline comment following the value, if any.
    trailer: &'a str,
}

/// Splits a non-comment line into key, unquoted value and inline comment.
fn split_assignment(line: &str) -> Option<Assignment<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key_part, rest) = body.split_once('=')?;
    let key = key_part.trim();
    if key.is_empty() {
        return None;
    }

    let mut quote: Option<char> = None;
    let mut comment_at = None;
    for (idx, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '#') => {
                comment_at = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let (value_part, trailer) = match comment_at {
        Some(idx) => {
            let value_part = &rest[..idx];
            let kept = value_part.trim_end().len();
            (&rest[..kept], &rest[kept..])
        }
        None => (rest, ""),
    };

    let value = value_part.trim().replace(['"', '\''], "");

    Some(Assignment {
        key,
        value: value.trim().to_string(),
        trailer,
    })
}

fn lookup_key(name: &str) -> Option<SettingKey> {
    SettingKey::ALL.iter().copied().find(|key| key.name() == name)
}

/// Parses document content, filling missing or unparseable keys with defaults.
pub fn parse(content: &str) -> ParsedSettings {
    let mut settings = SettingsData::default();
    let mut invalid_keys = Vec::new();
    let mut seen = HashSet::new();

    for line in content.lines() {
        let Some(assignment) = split_assignment(line) else {
            continue;
        };
        let Some(key) = lookup_key(assignment.key) else {
            continue;
        };

        match parse_value(key, &assignment.value) {
            Ok(value) => {
                settings.set_field(key, value);
                seen.insert(key);
                invalid_keys.retain(|k| *k != key);
            }
            Err(_) => {
                settings.set_field(key, SettingsData::default().get(key));
                seen.remove(&key);
                if !invalid_keys.contains(&key) {
                    invalid_keys.push(key);
                }
            }
        }
    }

    let mut modes_realigned = false;
    if !settings.modes_consistent() {
        // SIMULATION_MODE is authoritative unless only EXECUTION_MODE was given.
        if seen.contains(&SettingKey::ExecutionMode) && !seen.contains(&SettingKey::SimulationMode)
        {
            settings.set_simulation_mode(!settings.execution_mode);
        } else {
            settings = settings.normalized();
        }
        modes_realigned = true;
    }

    ParsedSettings {
        settings,
        invalid_keys,
        modes_realigned,
    }
}

/// Parses content and logs anything that was substituted.
pub fn parse_logged(content: &str) -> SettingsData {
    let parsed = parse(content);
    for key in &parsed.invalid_keys {
        warn!(key = %key, "unparseable setting, using default");
    }
    if parsed.modes_realigned {
        warn!("SIMULATION_MODE and EXECUTION_MODE disagreed, realigned from SIMULATION_MODE");
    }
    parsed.settings
}

/// Renders settings as a document.
///
/// With existing content the layout is preserved and only recognized keys are
/// rewritten; keys not yet present are appended in canonical order. Without
/// existing content a fresh sectioned template is produced.
pub fn format(settings: &SettingsData, existing: Option<&str>) -> String {
    match existing.filter(|content| !content.trim().is_empty()) {
        Some(content) => rewrite(settings, content),
        None => template(settings),
    }
}

fn rewrite(settings: &SettingsData, content: &str) -> String {
    let had_trailing_newline = content.ends_with('\n');
    let body = content.strip_suffix('\n').unwrap_or(content);

    let mut lines: Vec<String> = Vec::new();
    let mut used = HashSet::new();

    for raw in body.split('\n') {
        let (line, cr) = match raw.strip_suffix('\r') {
            Some(stripped) => (stripped, "\r"),
            None => (raw, ""),
        };

        let rewritten = split_assignment(line).and_then(|assignment| {
            lookup_key(assignment.key).map(|key| {
                used.insert(key);
                format!(
                    "{}={}{}{}",
                    key.name(),
                    settings.get(key),
                    assignment.trailer,
                    cr
                )
            })
        });

        lines.push(rewritten.unwrap_or_else(|| raw.to_string()));
    }

    for key in SettingKey::ALL {
        if !used.contains(&key) {
            lines.push(format!("{}={}", key.name(), settings.get(key)));
        }
    }

    let mut out = lines.join("\n");
    if had_trailing_newline {
        out.push('\n');
    }
    out
}

fn template(settings: &SettingsData) -> String {
    let sections: [(&str, &[SettingKey]); 4] = [
        (
            "# Execution Settings",
            &[
                SettingKey::SimulationMode,
                SettingKey::FlashLoanEnabled,
                SettingKey::SafeMode,
                SettingKey::ExecutionMode,
            ],
        ),
        (
            "# Profit & Risk Management",
            &[
                SettingKey::MinProfitPct,
                SettingKey::MaxProfitPct,
                SettingKey::PositionSizeUsd,
                SettingKey::MinLiquidityUsd,
            ],
        ),
        (
            "# Trading Parameters",
            &[
                SettingKey::MaxSlippage,
                SettingKey::MevProtectionCostUsd,
                SettingKey::MinProfitThresholdUsd,
                SettingKey::BaseGasPriceGwei,
            ],
        ),
        (
            "# Flash Loan Configuration",
            &[SettingKey::FlashLoanAmountUsd],
        ),
    ];

    let mut out = String::from("# Arbitrage Bot Configuration\n");
    for (header, keys) in sections {
        out.push('\n');
        out.push_str(header);
        out.push('\n');
        for key in keys {
            out.push_str(&format!("{}={}\n", key.name(), settings.get(*key)));
        }
    }
    out
}
