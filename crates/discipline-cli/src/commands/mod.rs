pub mod config;
pub mod rewards;
pub mod session;

use std::sync::Arc;

use discipline_core::storage::DisplayConfig;
use discipline_core::{Database, LocalClient, RewardBalance, RewardLedger};

pub type Client = LocalClient<Database>;

pub fn open_client() -> Result<Client, Box<dyn std::error::Error>> {
    let ledger = RewardLedger::new(Database::open()?);
    Ok(LocalClient::new(Arc::new(ledger)))
}

/// One line per category, e.g. `Movie Time: 10.00 min`.
pub fn balance_lines(balance: &RewardBalance, display: &DisplayConfig) -> Vec<String> {
    let prec = display.decimals;
    balance
        .iter()
        .map(|(category, amount)| {
            if category.is_time() {
                format!("{}: {amount:.prec$} min", category.label())
            } else {
                format!("{}: {}{amount:.prec$}", category.label(), display.currency_symbol)
            }
        })
        .collect()
}

/// `12m 5s`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
