mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DisplayConfig, LoggingConfig, TimerConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `DISCIPLINE_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/discipline-timer[-dev]/`, with `DISCIPLINE_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("DISCIPLINE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DISCIPLINE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("discipline-timer-dev")
            } else {
                base_dir.join("discipline-timer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
