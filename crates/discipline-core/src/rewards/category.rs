use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// One of the four redeemable reward kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    Movie,
    #[serde(alias = "youtube")]
    VideoStreaming,
    #[serde(alias = "instagram")]
    SocialMedia,
    SnackMoney,
}

impl RewardCategory {
    pub const ALL: [RewardCategory; 4] = [
        RewardCategory::Movie,
        RewardCategory::VideoStreaming,
        RewardCategory::SocialMedia,
        RewardCategory::SnackMoney,
    ];

    /// Reward units earned per hour of work.
    pub const fn rate(self) -> f64 {
        match self {
            RewardCategory::Movie => 10.0,
            RewardCategory::VideoStreaming => 5.0,
            RewardCategory::SocialMedia => 1.0,
            RewardCategory::SnackMoney => 1.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RewardCategory::Movie => "movie",
            RewardCategory::VideoStreaming => "video_streaming",
            RewardCategory::SocialMedia => "social_media",
            RewardCategory::SnackMoney => "snack_money",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RewardCategory::Movie => "Movie Time",
            RewardCategory::VideoStreaming => "Video Streaming",
            RewardCategory::SocialMedia => "Social Media",
            RewardCategory::SnackMoney => "Snack Money",
        }
    }

    /// Whether balances are minutes of media time rather than currency.
    pub const fn is_time(self) -> bool {
        !matches!(self, RewardCategory::SnackMoney)
    }
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(RewardCategory::Movie),
            "video_streaming" | "youtube" => Ok(RewardCategory::VideoStreaming),
            "social_media" | "instagram" => Ok(RewardCategory::SocialMedia),
            "snack_money" => Ok(RewardCategory::SnackMoney),
            _ => Err(LedgerError::UnknownCategory(s.to_string())),
        }
    }
}
