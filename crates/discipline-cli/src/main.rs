use clap::{Parser, Subcommand};
use discipline_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "discipline-cli", version, about = "Discipline Timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work session timing
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Reward balance, redemption and manual additions
    Rewards {
        #[command(subcommand)]
        action: commands::rewards::RewardsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("DISCIPLINE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(&config);
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "falling back to default configuration");
    }

    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action, &config),
        Commands::Rewards { action } => commands::rewards::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
