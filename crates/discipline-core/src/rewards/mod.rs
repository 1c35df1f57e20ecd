mod balance;
mod category;
pub mod conversion;
mod ticks;

pub use balance::{ProjectedReward, RewardBalance};
pub use category::RewardCategory;
pub use conversion::{earned_ticks, project, reward_for_minutes, worked_minutes, MinutePolicy};
pub use ticks::{Ticks, TICKS_PER_UNIT};
pub(crate) use ticks::TICKS_PER_RATE_MINUTE;
