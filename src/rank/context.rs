use tracing::trace;

use super::arith::RankBounds;
use super::position::Position;
use crate::storage::{RankFilter, RankStore, SortOrder};
use crate::types::{Rank, Result};

/// Ranks that bracket a placement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bracket {
    /// Rank of the neighbor before the position.
    pub below: Rank,
    /// Rank of the neighbor after it, or the upper bound.
    pub above: Rank,
    /// No record bounds the placement from above; it appends.
    pub open_above: bool,
}

/// State for a single insert or update.
///
/// Holds the row selection and the scope extremes, each resolved at most
/// once. Dropped when the operation finishes; never shared across records.
#[derive(Debug)]
pub struct RankContext {
    filter: RankFilter,
    bounds: RankBounds,
    position: Position,
    first: Option<Option<Rank>>,
    last: Option<Option<Rank>>,
    bracket: Option<Bracket>,
}

impl RankContext {
    /// Starts an operation with nothing resolved yet.
    pub fn new(filter: RankFilter, bounds: RankBounds, position: Position) -> Self {
        Self {
            filter,
            bounds,
            position,
            first: None,
            last: None,
            bracket: None,
        }
    }

    /// Rows sharing the ordering space, minus the record itself.
    pub fn filter(&self) -> &RankFilter {
        &self.filter
    }

    /// Bounds the candidate must respect.
    pub fn bounds(&self) -> &RankBounds {
        &self.bounds
    }

    /// Requested position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Lowest rank among the other records in scope.
    pub fn current_first<S: RankStore + ?Sized>(&mut self, store: &mut S) -> Result<Option<Rank>> {
        if let Some(first) = self.first {
            return Ok(first);
        }
        let first = store.query_extreme(&self.filter, SortOrder::Asc)?;
        trace!(?first, "resolved current first rank");
        self.first = Some(first);
        Ok(first)
    }

    /// Highest rank among the other records in scope.
    pub fn current_last<S: RankStore + ?Sized>(&mut self, store: &mut S) -> Result<Option<Rank>> {
        if let Some(last) = self.last {
            return Ok(last);
        }
        let last = store.query_extreme(&self.filter, SortOrder::Desc)?;
        trace!(?last, "resolved current last rank");
        self.last = Some(last);
        Ok(last)
    }

    pub(crate) fn set_bracket(&mut self, bracket: Bracket) {
        self.bracket = Some(bracket);
    }

    /// Bracket recorded by neighbor resolution, if it ran.
    pub fn bracket(&self) -> Option<Bracket> {
        self.bracket
    }

    /// Whether the candidate was computed as an append.
    pub fn appends(&self) -> bool {
        self.bracket.is_some_and(|b| b.open_above)
    }
}
