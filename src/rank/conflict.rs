//! Conflict detection and resolution.
//!
//! A candidate rank is final unless it leaves the range or another record in
//! scope already holds it. Conflicts are resolved by the cheapest policy that
//! still keeps ranks unique and ordered:
//!
//! 1. shift the band below the candidate down by one (appends at the maximum),
//! 2. shift the band from the candidate upward up by one,
//! 3. respace the whole scope evenly.

use tracing::{debug, warn};

use super::arith::{RankBounds, Spacing};
use super::context::RankContext;
use super::metrics::RankMetrics;
use crate::storage::{RankFilter, RankPredicate, RankStore, SortOrder};
use crate::types::{Rank, RecordId, Result};

/// Whether `candidate` must be resolved before it can be written.
pub fn detect_conflict<S: RankStore + ?Sized>(
    ctx: &RankContext,
    store: &mut S,
    candidate: Rank,
) -> Result<bool> {
    if !ctx.bounds().contains(candidate) {
        return Ok(true);
    }
    Ok(store.query_exact(ctx.filter(), candidate)?.is_some())
}

/// Opens a slot for `candidate` and returns the rank the record should take.
///
/// Writes to other records in scope as a side effect. The record being
/// placed is never part of the bulk update.
pub fn shift_ranks<S: RankStore + ?Sized>(
    ctx: &mut RankContext,
    store: &mut S,
    candidate: Rank,
    metrics: &dyn RankMetrics,
) -> Result<Rank> {
    let (min, max) = (ctx.bounds().min(), ctx.bounds().max());
    let first = ctx.current_first(store)?;
    let last = ctx.current_last(store)?;

    if first.is_some_and(|f| f > min) && candidate == max && ctx.appends() {
        let rows = store.bulk_increment(ctx.filter(), RankPredicate::AtMost(candidate), -1)?;
        debug!(candidate, rows, "shifted ranks down");
        metrics.shifted("down", rows);
        return Ok(candidate);
    }

    if let Some(last) = last {
        if last < max - 1 && candidate < last {
            let rows = store.bulk_increment(ctx.filter(), RankPredicate::AtLeast(candidate), 1)?;
            debug!(candidate, rows, "shifted ranks up");
            metrics.shifted("up", rows);
            return Ok(candidate);
        }
    }

    rebalance_ranks(ctx, store, candidate, metrics)
}

/// Respaces every other record in scope and slots the placed record in.
///
/// The placed record lands after the records ranked below `attempted`, or
/// after all of them when it was appending. Everything else keeps its order.
pub fn rebalance_ranks<S: RankStore + ?Sized>(
    ctx: &mut RankContext,
    store: &mut S,
    attempted: Rank,
    metrics: &dyn RankMetrics,
) -> Result<Rank> {
    let others = store.query_ordered(ctx.filter(), SortOrder::Asc, None, 0)?;
    let spacing = Spacing::new(ctx.bounds(), others.len() + 1)?;
    let slot = if ctx.appends() {
        others.len()
    } else {
        others.iter().filter(|row| row.rank < attempted).count()
    };

    let updates: Vec<(RecordId, Rank)> = others
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let index = if i < slot { i } else { i + 1 };
            let rank = spacing.rank_at(index);
            (rank != row.rank).then_some((row.id, rank))
        })
        .collect();
    store.write_many(&updates)?;

    let placed = spacing.rank_at(slot);
    warn!(
        attempted,
        placed,
        records = spacing.count(),
        rewritten = updates.len(),
        "rebalanced scope"
    );
    metrics.rebalanced(updates.len());
    Ok(placed)
}

/// Outcome of an explicit scope respacing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RebalanceReport {
    /// Records found in scope.
    pub records: usize,
    /// Records whose rank changed.
    pub rewritten: usize,
}

/// Spaces every record selected by `filter` evenly across `bounds`, keeping order.
pub fn rebalance_scope<S: RankStore + ?Sized>(
    store: &mut S,
    filter: &RankFilter,
    bounds: &RankBounds,
    metrics: &dyn RankMetrics,
) -> Result<RebalanceReport> {
    let rows = store.query_ordered(filter, SortOrder::Asc, None, 0)?;
    if rows.is_empty() {
        return Ok(RebalanceReport::default());
    }
    let spacing = Spacing::new(bounds, rows.len())?;
    let updates: Vec<(RecordId, Rank)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let rank = spacing.rank_at(i);
            (rank != row.rank).then_some((row.id, rank))
        })
        .collect();
    store.write_many(&updates)?;
    debug!(records = rows.len(), rewritten = updates.len(), "respaced scope");
    metrics.rebalanced(updates.len());
    Ok(RebalanceReport {
        records: rows.len(),
        rewritten: updates.len(),
    })
}
