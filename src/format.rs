//! Text formatting shared by notifications and views.

use std::time::Duration;

/// Compact duration: `45s`, `2m 5s`, `1h 2m`, `3d 4h`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Uptime as whole minutes and seconds, e.g. `125m 7s`.
pub fn format_uptime(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

pub fn add_thousand_separators(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Dollar amount with two decimals and grouped thousands: `$1,234.50`.
pub fn format_usd(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    format!(
        "{}${}.{:02}",
        sign,
        add_thousand_separators(cents / 100),
        cents % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d 1h");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0m 0s");
        assert_eq!(format_uptime(61), "1m 1s");
        assert_eq!(format_uptime(7507), "125m 7s");
    }

    #[test]
    fn test_add_thousand_separators() {
        assert_eq!(add_thousand_separators(0), "0");
        assert_eq!(add_thousand_separators(999), "999");
        assert_eq!(add_thousand_separators(1000), "1,000");
        assert_eq!(add_thousand_separators(1234567), "1,234,567");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(-2.345), "-$2.35");
    }
}
