use serde::{Deserialize, Serialize};

use super::{RewardCategory, Ticks};

/// Quantity held per reward category.
///
/// Minutes for the time categories, currency units for snack money. The
/// authoritative copy lives in the ledger; every other holder only keeps a
/// snapshot of it. Values written by the ledger are always whole
/// [`Ticks`], so converting back with [`ticks`](Self::ticks) is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBalance {
    #[serde(default)]
    pub movie: f64,
    #[serde(default, alias = "youtube")]
    pub video_streaming: f64,
    #[serde(default, alias = "instagram")]
    pub social_media: f64,
    #[serde(default)]
    pub snack_money: f64,
}

/// Unrealized reward implied by an in-progress session. Never persisted.
pub type ProjectedReward = RewardBalance;

impl RewardBalance {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, category: RewardCategory) -> f64 {
        match category {
            RewardCategory::Movie => self.movie,
            RewardCategory::VideoStreaming => self.video_streaming,
            RewardCategory::SocialMedia => self.social_media,
            RewardCategory::SnackMoney => self.snack_money,
        }
    }

    pub fn get_mut(&mut self, category: RewardCategory) -> &mut f64 {
        match category {
            RewardCategory::Movie => &mut self.movie,
            RewardCategory::VideoStreaming => &mut self.video_streaming,
            RewardCategory::SocialMedia => &mut self.social_media,
            RewardCategory::SnackMoney => &mut self.snack_money,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RewardCategory, f64)> + '_ {
        RewardCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn ticks(&self, category: RewardCategory) -> Ticks {
        Ticks::from_units(self.get(category))
    }

    pub fn set_ticks(&mut self, category: RewardCategory, ticks: Ticks) {
        *self.get_mut(category) = ticks.to_units();
    }

    /// Element-wise sum, exact to the tick.
    pub fn plus(&self, other: &RewardBalance) -> RewardBalance {
        let mut out = *self;
        for category in RewardCategory::ALL {
            out.set_ticks(category, self.ticks(category).saturating_add(other.ticks(category)));
        }
        out
    }

    pub fn is_non_negative(&self) -> bool {
        self.iter().all(|(_, v)| v >= 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_mut_targets_single_category() {
        let mut balance = RewardBalance::zero();
        *balance.get_mut(RewardCategory::SocialMedia) += 3.0;
        assert_eq!(balance.social_media, 3.0);
        assert_eq!(balance.movie, 0.0);
        assert_eq!(balance.get(RewardCategory::SocialMedia), 3.0);
    }

    #[test]
    fn plus_adds_element_wise() {
        let a = RewardBalance {
            movie: 1.0,
            video_streaming: 2.0,
            social_media: 3.0,
            snack_money: 4.0,
        };
        let sum = a.plus(&a);
        assert_eq!(sum.movie, 2.0);
        assert_eq!(sum.snack_money, 8.0);
    }

    #[test]
    fn deserializes_legacy_field_names() {
        let parsed: RewardBalance =
            serde_json::from_str(r#"{"movie": 10, "youtube": 5, "instagram": 1}"#).unwrap();
        assert_eq!(parsed.video_streaming, 5.0);
        assert_eq!(parsed.social_media, 1.0);
        assert_eq!(parsed.snack_money, 0.0);
    }
}
