use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rewards::RewardBalance;
use crate::timer::SessionId;

/// Session state changes produce an Event.
/// The CLI prints them as JSON; a GUI would poll for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: SessionId,
        at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: SessionId,
        elapsed_seconds: u64,
        worked_minutes: f64,
        at: DateTime<Utc>,
    },
    /// A completed session was folded into the ledger.
    RewardsDeposited {
        worked_minutes: f64,
        balances: RewardBalance,
        at: DateTime<Utc>,
    },
}
