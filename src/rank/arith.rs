//! Rank arithmetic.
//!
//! Every rank the engine produces is either a bisection of two bounds or a
//! slot on an evenly spaced grid. Both round half away from zero.

use serde::{Deserialize, Serialize};

use crate::types::{MoveErrorKind, Rank, RankError, Result};

/// Lowest rank representable in the default range (signed 24-bit).
pub const MIN_RANK: Rank = -8_388_607;
/// Highest rank representable in the default range (signed 24-bit).
pub const MAX_RANK: Rank = 8_388_607;

/// Inclusive range of ranks available to a scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct RankBounds {
    min: Rank,
    max: Rank,
}

#[derive(Deserialize)]
struct RawBounds {
    min: Rank,
    max: Rank,
}

impl TryFrom<RawBounds> for RankBounds {
    type Error = RankError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        RankBounds::new(raw.min, raw.max)
    }
}

impl Default for RankBounds {
    fn default() -> Self {
        Self {
            min: MIN_RANK,
            max: MAX_RANK,
        }
    }
}

impl RankBounds {
    /// Creates a range, rejecting ranges without room for a bisection.
    pub fn new(min: Rank, max: Rank) -> Result<Self> {
        if min >= max || (max as i128 - min as i128) < 2 {
            return Err(RankError::InvalidArgument(format!(
                "rank bounds [{min}, {max}] leave no room between them"
            )));
        }
        Ok(Self { min, max })
    }

    /// Lower bound, inclusive.
    pub fn min(&self) -> Rank {
        self.min
    }

    /// Upper bound, inclusive.
    pub fn max(&self) -> Rank {
        self.max
    }

    /// Whether `rank` lies inside the bounds.
    pub fn contains(&self, rank: Rank) -> bool {
        (self.min..=self.max).contains(&rank)
    }

    /// Bisects `above` and `below`, substituting the range ends for absent bounds.
    pub fn between(&self, above: Option<Rank>, below: Option<Rank>) -> Rank {
        rank_between(above.unwrap_or(self.max), below.unwrap_or(self.min))
    }

    /// Midpoint of the whole range.
    pub fn midpoint(&self) -> Rank {
        self.between(None, None)
    }

    /// Fails with an invalid move when `rank` is outside the range.
    pub fn check(&self, rank: Rank) -> Result<Rank> {
        if rank > self.max {
            Err(RankError::invalid_move(MoveErrorKind::TooLarge))
        } else if rank < self.min {
            Err(RankError::invalid_move(MoveErrorKind::TooSmall))
        } else {
            Ok(rank)
        }
    }
}

/// Returns `round((above - below) / 2) + below`.
///
/// Strictly between the two when they are at least two apart. No validation.
pub fn rank_between(above: Rank, below: Rank) -> Rank {
    let half = div_round(above as i128 - below as i128, 2);
    (half + below as i128) as Rank
}

/// Evenly spaced grid of `count` slots across a [`RankBounds`].
///
/// Slot `i` sits at `round((max - min) / count) * i + min`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Spacing {
    min: Rank,
    step: i128,
    count: usize,
}

impl Spacing {
    /// Builds the grid, failing when `count` slots cannot be distinct and in range.
    pub fn new(bounds: &RankBounds, count: usize) -> Result<Self> {
        let span = bounds.max as i128 - bounds.min as i128;
        let count = count.max(1);
        let step = div_round(span, count as i128);
        if step < 1 || step * (count as i128 - 1) > span {
            return Err(RankError::invalid_move(MoveErrorKind::TooLarge));
        }
        Ok(Self {
            min: bounds.min,
            step,
            count,
        })
    }

    /// Number of slots laid out.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Rank of slot `index`.
    pub fn rank_at(&self, index: usize) -> Rank {
        (self.step * index as i128 + self.min as i128) as Rank
    }
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if 2 * remainder.abs() >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_bisects_to_zero() {
        assert_eq!(rank_between(MAX_RANK, MIN_RANK), 0);
        assert_eq!(RankBounds::default().midpoint(), 0);
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(div_round(7, 2), 4);
        assert_eq!(div_round(-7, 2), -4);
        assert_eq!(div_round(6, 4), 2);
        assert_eq!(div_round(5, 4), 1);
        assert_eq!(rank_between(MAX_RANK, 0), 4_194_304);
        assert_eq!(rank_between(100, MIN_RANK), -4_194_253);
    }

    #[test]
    fn adjacent_bounds_collapse_onto_above() {
        assert_eq!(rank_between(11, 10), 11);
        assert_eq!(rank_between(10, 10), 10);
        assert_eq!(rank_between(12, 10), 11);
    }

    #[test]
    fn bounds_reject_degenerate_ranges() {
        assert!(RankBounds::new(5, 5).is_err());
        assert!(RankBounds::new(5, 6).is_err());
        assert!(RankBounds::new(6, 5).is_err());
        let bounds = RankBounds::new(0, 2).unwrap();
        assert_eq!(bounds.midpoint(), 1);
    }

    #[test]
    fn check_reports_direction() {
        let bounds = RankBounds::default();
        assert_eq!(bounds.check(MAX_RANK).unwrap(), MAX_RANK);
        assert!(matches!(
            bounds.check(MAX_RANK + 1),
            Err(RankError::InvalidMove {
                kind: MoveErrorKind::TooLarge
            })
        ));
        assert!(matches!(
            bounds.check(MIN_RANK - 1),
            Err(RankError::InvalidMove {
                kind: MoveErrorKind::TooSmall
            })
        ));
    }

    #[test]
    fn spacing_spans_range_in_order() {
        let spacing = Spacing::new(&RankBounds::default(), 4).unwrap();
        let ranks: Vec<Rank> = (0..4).map(|i| spacing.rank_at(i)).collect();
        assert_eq!(ranks[0], MIN_RANK);
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert!(ranks.iter().all(|r| RankBounds::default().contains(*r)));
    }

    #[test]
    fn spacing_refuses_overfull_range() {
        let bounds = RankBounds::new(0, 4).unwrap();
        assert!(Spacing::new(&bounds, 5).is_ok());
        assert!(matches!(
            Spacing::new(&bounds, 9),
            Err(RankError::InvalidMove {
                kind: MoveErrorKind::TooLarge
            })
        ));
    }

    #[test]
    fn bounds_deserialize_with_validation() {
        let ok: RankBounds = serde_json::from_str(r#"{"min":-10,"max":10}"#).unwrap();
        assert_eq!((ok.min(), ok.max()), (-10, 10));
        assert!(serde_json::from_str::<RankBounds>(r#"{"min":10,"max":-10}"#).is_err());
    }
}
