//! Fixed-point reward quantities.
//!
//! The ledger counts every balance in ticks of 1/3600 of a unit. One second
//! of work at any rate and one cent of snack money are both whole ticks, so
//! deposits and redemptions add up exactly. `f64` only appears at the edges.

use serde::{Deserialize, Serialize};

/// Ticks in one reward unit.
pub const TICKS_PER_UNIT: i64 = 3600;

/// Ticks earned per minute of work at a rate of one unit per hour.
pub(crate) const TICKS_PER_RATE_MINUTE: i64 = TICKS_PER_UNIT / 60;

/// Largest magnitude with an exact `f64` image.
const MAX_TICKS: i64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticks(i64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Nearest tick count to `units`, saturating at the representable range.
    /// NaN maps to zero.
    pub fn from_units(units: f64) -> Self {
        Self::from_scaled(units * TICKS_PER_UNIT as f64)
    }

    /// Like [`from_units`](Self::from_units), but `None` for values that are
    /// not finite or fall outside the representable range.
    pub fn try_from_units(units: f64) -> Option<Self> {
        let scaled = (units * TICKS_PER_UNIT as f64).round();
        if scaled.is_finite() && scaled.abs() <= MAX_TICKS as f64 {
            Some(Self(scaled as i64))
        } else {
            None
        }
    }

    /// Round an already scaled tick count.
    pub(crate) fn from_scaled(scaled: f64) -> Self {
        let clamped = scaled.round().clamp(-(MAX_TICKS as f64), MAX_TICKS as f64);
        // `as` maps NaN to 0.
        Self(clamped as i64)
    }

    pub fn to_units(self) -> f64 {
        self.0 as f64 / TICKS_PER_UNIT as f64
    }

    pub fn saturating_add(self, other: Ticks) -> Ticks {
        Ticks(self.0.saturating_add(other.0).clamp(-MAX_TICKS, MAX_TICKS))
    }

    pub fn saturating_sub(self, other: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(other.0).clamp(-MAX_TICKS, MAX_TICKS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_and_seconds_are_whole_ticks() {
        assert_eq!(Ticks::from_units(0.01).raw(), 36);
        // One second at one unit per hour.
        assert_eq!(Ticks::from_units(1.0 / 3600.0).raw(), 1);
        assert_eq!(Ticks::from_units(1.5).to_units(), 1.5);
    }

    #[test]
    fn sixths_add_up_to_a_whole_unit() {
        let sixth = Ticks::from_units(1.0 / 6.0);
        let mut sum = Ticks::ZERO;
        for _ in 0..6 {
            sum = sum.saturating_add(sixth);
        }
        assert_eq!(sum.to_units(), 1.0);
        assert_eq!(sum.saturating_sub(Ticks::from_units(1.0)), Ticks::ZERO);
    }

    #[test]
    fn out_of_range_values_are_rejected_or_clamped() {
        assert_eq!(Ticks::try_from_units(f64::NAN), None);
        assert_eq!(Ticks::try_from_units(f64::INFINITY), None);
        assert_eq!(Ticks::try_from_units(1e300), None);
        assert_eq!(Ticks::from_units(f64::NAN), Ticks::ZERO);
        assert_eq!(Ticks::from_units(1e300).raw(), MAX_TICKS);
    }
}
