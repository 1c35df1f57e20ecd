//! Pure conversions from work time to reward units.
//!
//! Nothing here touches the ledger: the projection shown while a session is
//! running is recomputed from elapsed seconds on every tick and thrown away
//! whenever the authoritative balance is refreshed.

use serde::{Deserialize, Serialize};

use super::{ProjectedReward, RewardBalance, RewardCategory, Ticks, TICKS_PER_RATE_MINUTE};

/// How elapsed session seconds become deposited work minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinutePolicy {
    /// `floor(elapsed / 60)`; up to 59 seconds per session are dropped.
    #[default]
    Truncate,
    /// `elapsed / 60` with the remainder kept as a fraction.
    Fractional,
}

/// Work minutes credited for a stopped session.
pub fn worked_minutes(elapsed_seconds: u64, policy: MinutePolicy) -> f64 {
    match policy {
        MinutePolicy::Truncate => (elapsed_seconds / 60) as f64,
        MinutePolicy::Fractional => elapsed_seconds as f64 / 60.0,
    }
}

/// Ticks earned in `category` for `minutes` of work.
pub fn earned_ticks(minutes: f64, category: RewardCategory) -> Ticks {
    Ticks::from_scaled(minutes * category.rate() * TICKS_PER_RATE_MINUTE as f64)
}

/// Reward units earned for `minutes` of work, per category.
pub fn reward_for_minutes(minutes: f64) -> RewardBalance {
    let mut out = RewardBalance::zero();
    for category in RewardCategory::ALL {
        *out.get_mut(category) = earned_ticks(minutes, category).to_units();
    }
    out
}

/// Unrealized reward for the running session.
pub fn project(elapsed_seconds: u64) -> ProjectedReward {
    reward_for_minutes(elapsed_seconds as f64 / 60.0)
}
