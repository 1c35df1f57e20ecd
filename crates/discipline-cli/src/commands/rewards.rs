use clap::Subcommand;
use discipline_core::{Config, LedgerClient, RedeemRequest};

use super::{balance_lines, open_client};

#[derive(Subcommand)]
pub enum RewardsAction {
    /// Show the current reward balance
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Spend reward units from one category
    Redeem {
        /// movie, video_streaming, social_media or snack_money
        category: String,
        /// Units to spend (minutes, or currency for snack_money)
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Add worked minutes without a timed session
    Add {
        #[arg(allow_negative_numbers = true)]
        minutes: i64,
    },
    /// Recent deposits and redemptions
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: RewardsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = open_client()?;

    match action {
        RewardsAction::Status { json } => {
            let report = client.fetch_status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Total work: {} min", report.total_work_minutes);
                for line in balance_lines(&report.balances, &config.display) {
                    println!("{line}");
                }
            }
        }
        RewardsAction::Redeem { category, amount } => {
            let receipt = client.redeem(&RedeemRequest { category, amount })?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        RewardsAction::Add { minutes } => {
            let receipt = client.add_time(minutes)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        RewardsAction::History { limit } => {
            let entries = client.history(limit)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
