//! # Discipline Core Library
//!
//! This library provides the core logic for the Discipline Timer: it times
//! work sessions and converts the worked time into spendable reward units
//! (movie, video streaming and social media minutes, plus snack money).
//! The CLI binary is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Session Timer**: an `Idle`/`Running` state machine counting seconds of
//!   the current session, driven by a cancellable tick source
//! - **Reward Ledger**: the single writer of the authoritative balance, with
//!   atomic deposit and redemption in fixed-point ticks over a pluggable store
//! - **Storage**: SQLite-backed balance store and TOML-based configuration
//! - **Tracker**: reconciles the in-progress projection with the balance the
//!   ledger returns
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: session state machine
//! - [`RewardLedger`]: balance owner and mutation interface
//! - [`RewardTracker`]: caller-facing glue between the two
//! - [`Database`]: persistent balance store
//! - [`Config`]: application configuration management

pub mod client;
pub mod error;
pub mod events;
pub mod ledger;
pub mod rewards;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use client::{LedgerClient, LocalClient, Receipt, RedeemRequest, SessionReceipt, StatusReport};
pub use error::{ConfigError, CoreError, DatabaseError, LedgerError};
pub use events::Event;
pub use ledger::{BalanceStore, EntryKind, LedgerEntry, LedgerState, MemoryStore, RewardLedger};
pub use rewards::{MinutePolicy, ProjectedReward, RewardBalance, RewardCategory, Ticks};
pub use storage::{Config, Database};
pub use timer::{SessionId, SessionTimer, Ticker, TimerState};
pub use tracker::{RewardTracker, RewardView};
