use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use discipline_core::rewards;
use discipline_core::{Config, Event, RewardTracker, Ticker};

use super::{balance_lines, format_elapsed, open_client};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Time a work session in the foreground; Ctrl-C stops it and deposits the minutes
    Run {
        /// Stop automatically after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
        /// Do not redraw the live projection on every tick
        #[arg(long)]
        quiet: bool,
    },
}

pub fn run(action: SessionAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run { seconds, quiet } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_session(config, seconds.map(Duration::from_secs), quiet))
        }
    }
}

async fn run_session(
    config: &Config,
    limit: Option<Duration>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = RewardTracker::new(open_client()?, config.timer.minute_policy);
    tracker.load()?;

    let started = tracker.start()?;
    println!("{}", serde_json::to_string_pretty(&started)?);
    let Event::SessionStarted { session_id, .. } = started else {
        return Err("timer did not report a started session".into());
    };

    let balances = *tracker.view().balances();
    let display = config.display.clone();
    let ticker = Ticker::spawn(
        tracker.timer(),
        session_id,
        config.timer.tick_interval(),
        move |elapsed| {
            if quiet {
                return;
            }
            let totals = balances.plus(&rewards::project(elapsed));
            let line = balance_lines(&totals, &display).join(" | ");
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\r{}  {line}", format_elapsed(elapsed));
            let _ = err.flush();
        },
    );

    match limit {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                res = tokio::signal::ctrl_c() => res?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    let outcome = tracker.stop();
    ticker.cancel();
    if !quiet {
        eprintln!();
    }

    match outcome {
        Ok(outcome) => {
            for event in outcome.events() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
            eprintln!("{}", tracker.view().status());
            for line in balance_lines(tracker.view().balances(), &config.display) {
                eprintln!("  {line}");
            }
            Ok(())
        }
        Err(e) => {
            if let Some(pending) = tracker.pending() {
                eprintln!(
                    "warning: {} worked minutes were not deposited",
                    pending.worked_minutes
                );
            }
            Err(e.into())
        }
    }
}
