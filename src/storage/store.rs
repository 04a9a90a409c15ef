#![forbid(unsafe_code)]

use crate::types::{Rank, RecordId, Result, ScopeKey};

/// Which records share an ordering space with the record being placed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeFilter {
    /// Scoping is not configured: the whole collection is one scope.
    Any,
    /// Only records whose scope equals the value. `None` selects unscoped records.
    Is(Option<ScopeKey>),
}

impl ScopeFilter {
    /// Whether a row with `scope` belongs to the space.
    pub fn matches(&self, scope: Option<&ScopeKey>) -> bool {
        match self {
            ScopeFilter::Any => true,
            ScopeFilter::Is(key) => key.as_ref() == scope,
        }
    }
}

/// Row selection shared by every query and bulk update of one operation.
///
/// Combines the scope with the identity of the record being placed, which
/// never takes part in its own bracketing, collision checks or shifts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankFilter {
    /// Ordering space.
    pub scope: ScopeFilter,
    /// Record being placed, left out of every query.
    pub exclude: Option<RecordId>,
}

impl RankFilter {
    /// Selects `scope`, leaving out `exclude`.
    pub fn new(scope: ScopeFilter, exclude: Option<RecordId>) -> Self {
        Self { scope, exclude }
    }

    /// Selects the whole scope without excluding anything.
    pub fn scope(scope: ScopeFilter) -> Self {
        Self::new(scope, None)
    }

    /// Whether the row takes part in the operation.
    pub fn matches(&self, id: RecordId, scope: Option<&ScopeKey>) -> bool {
        self.exclude != Some(id) && self.scope.matches(scope)
    }
}

/// Direction of a ranked query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortOrder {
    /// Lowest rank first.
    Asc,
    /// Highest rank first.
    Desc,
}

/// Band of ranks touched by a bulk increment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RankPredicate {
    /// `rank >= r`
    AtLeast(Rank),
    /// `rank <= r`
    AtMost(Rank),
}

impl RankPredicate {
    /// Whether `rank` falls in the band.
    pub fn matches(&self, rank: Rank) -> bool {
        match *self {
            RankPredicate::AtLeast(r) => rank >= r,
            RankPredicate::AtMost(r) => rank <= r,
        }
    }
}

/// Identity and rank of a stored record, as seen by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RankedRow {
    /// Record identity.
    pub id: RecordId,
    /// Current rank.
    pub rank: Rank,
}

/// Query and update surface the rank engine needs from a backing collection.
///
/// Every call must execute inside the transaction of the record mutation
/// that triggered it. Implementations apply the [`RankFilter`] to every
/// call and never commit or roll back on their own.
pub trait RankStore {
    /// Rows ordered by rank, skipping `offset` and returning at most `limit`.
    fn query_ordered(
        &mut self,
        filter: &RankFilter,
        order: SortOrder,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankedRow>>;

    /// The row holding exactly `rank`, if any.
    fn query_exact(&mut self, filter: &RankFilter, rank: Rank) -> Result<Option<RankedRow>>;

    /// Lowest (`Asc`) or highest (`Desc`) rank in the selection.
    fn query_extreme(&mut self, filter: &RankFilter, order: SortOrder) -> Result<Option<Rank>> {
        Ok(self
            .query_ordered(filter, order, Some(1), 0)?
            .first()
            .map(|row| row.rank))
    }

    /// Adds `delta` to the rank of every selected row matching `predicate`.
    /// Returns the number of rows changed.
    fn bulk_increment(
        &mut self,
        filter: &RankFilter,
        predicate: RankPredicate,
        delta: i64,
    ) -> Result<usize>;

    /// Sets the rank of one record.
    fn write_rank(&mut self, id: RecordId, rank: Rank) -> Result<()>;

    /// Sets several ranks in one pass.
    fn write_many(&mut self, ranks: &[(RecordId, Rank)]) -> Result<()> {
        for &(id, rank) in ranks {
            self.write_rank(id, rank)?;
        }
        Ok(())
    }
}

impl<S: RankStore + ?Sized> RankStore for &mut S {
    fn query_ordered(
        &mut self,
        filter: &RankFilter,
        order: SortOrder,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankedRow>> {
        (**self).query_ordered(filter, order, limit, offset)
    }

    fn query_exact(&mut self, filter: &RankFilter, rank: Rank) -> Result<Option<RankedRow>> {
        (**self).query_exact(filter, rank)
    }

    fn query_extreme(&mut self, filter: &RankFilter, order: SortOrder) -> Result<Option<Rank>> {
        (**self).query_extreme(filter, order)
    }

    fn bulk_increment(
        &mut self,
        filter: &RankFilter,
        predicate: RankPredicate,
        delta: i64,
    ) -> Result<usize> {
        (**self).bulk_increment(filter, predicate, delta)
    }

    fn write_rank(&mut self, id: RecordId, rank: Rank) -> Result<()> {
        (**self).write_rank(id, rank)
    }

    fn write_many(&mut self, ranks: &[(RecordId, Rank)]) -> Result<()> {
        (**self).write_many(ranks)
    }
}
