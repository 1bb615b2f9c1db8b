//! Navigation between tabs.

use crate::state::Tab;

pub const TITLE: &str = "Arbitrage Bot";
pub const FOOTER: &str = "© 2025 Arbitrage Bot";

pub fn description(tab: Tab) -> &'static str {
    match tab {
        Tab::Home => "Dashboard & Trading",
        Tab::Settings => "Configuration & Preferences",
        Tab::Info => "Help & Documentation",
    }
}

pub fn render(active: Tab) -> String {
    let tabs: Vec<String> = Tab::ALL
        .iter()
        .map(|&tab| {
            if tab == active {
                format!("[{}]", tab.label())
            } else {
                format!(" {} ", tab.label())
            }
        })
        .collect();
    format!(
        "{} v{}  {}  {}\n",
        TITLE,
        env!("CARGO_PKG_VERSION"),
        tabs.join(" "),
        description(active)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tab_is_bracketed() {
        let text = render(Tab::Settings);
        assert!(text.contains("[Settings]"));
        assert!(text.contains(" Home "));
        assert!(text.contains("Configuration & Preferences"));
    }
}
