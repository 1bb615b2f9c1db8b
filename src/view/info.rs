//! Static help page.

pub struct Section {
    pub title: &'static str,
    pub items: &'static [&'static str],
}

pub const SECTIONS: &[Section] = &[
    Section {
        title: "Quick Start Guide",
        items: &[
            "1. Configure Settings: open the Settings tab (`tab settings`) and keep Simulation Mode ON for safe testing",
            "2. Start the Bot: return to Home (`tab home`) and run `start` to begin monitoring",
            "3. Monitor Opportunities: watch the opportunity table and the performance cards",
            "4. Go Live (Advanced): after testing, run `mode` to disable Simulation Mode",
        ],
    },
    Section {
        title: "Key Features",
        items: &[
            "Multi-DEX Monitoring: real-time prices across Uniswap V3, SushiSwap and Aerodrome",
            "Safe Mode: small position sizes and major tokens only",
            "Flash Loan Support: capital-efficient arbitrage using Aave flash loans",
            "Real-time Execution: automatic trade execution with gas optimization",
        ],
    },
    Section {
        title: "Safety Guidelines",
        items: &[
            "Always test in Simulation Mode first. Never start with real money until you understand the system",
            "Start with small position sizes. Even in live mode, use $5-10 initially",
            "Keep Safe Mode enabled. It restricts trading to major tokens and reasonable amounts",
            "Monitor gas prices. High gas costs can eliminate arbitrage profits",
            "Understand the risks. Arbitrage trading involves financial risk and potential losses",
        ],
    },
    Section {
        title: "Understanding Key Settings",
        items: &[
            "Simulation: shows what trades would be executed without spending real money",
            "Live: executes real transactions using your wallet funds",
            "Min Profit: opportunities below this percentage are ignored",
            "Max Profit: opportunities above this may be unrealistic or risky",
            "Position Size: USD traded per opportunity. Start at $5-10 and increase gradually",
            "Max Slippage: price movement tolerated during execution. Higher values reduce failed trades but increase risk",
        ],
    },
    Section {
        title: "Common Issues & Solutions",
        items: &[
            "Bot Not Starting: check that the backend is running and the status bar shows Connected",
            "No Opportunities Found: lower Min Profit or raise Max Slippage. Market conditions also matter",
            "Trades Failing: raise slippage tolerance, check gas settings or reduce position size",
            "High Gas Costs: watch Base network congestion and raise Min Profit Threshold",
        ],
    },
    Section {
        title: "Technical Details",
        items: &[
            "Supported Networks: Base Network (Coinbase L2)",
            "Supported DEXes: Uniswap V3, SushiSwap, Aerodrome",
            "Connectivity: Socket.IO over WebSocket to the local backend",
        ],
    },
];

pub fn render() -> String {
    let mut out = String::new();
    for section in SECTIONS {
        out.push_str(section.title);
        out.push('\n');
        for item in section.items {
            out.push_str(&format!("  - {}\n", item));
        }
    }
    out.push_str("This is educational software. Use it at your own risk.\n");
    out
}
