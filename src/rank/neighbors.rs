use tracing::trace;

use super::context::{Bracket, RankContext};
use crate::storage::{RankStore, SortOrder};
use crate::types::Result;

/// Finds the ranks that should bracket a record placed at `position`.
///
/// `position <= 0` brackets against the front of the scope. Otherwise the
/// records at offsets `position - 1` and `position` (ascending, excluding the
/// record itself) become the lower and upper neighbor; a missing upper
/// neighbor leaves the bracket open towards the range maximum.
pub fn resolve_neighbors<S: RankStore + ?Sized>(
    ctx: &mut RankContext,
    store: &mut S,
    position: i64,
) -> Result<Bracket> {
    let (min, max) = (ctx.bounds().min(), ctx.bounds().max());
    let bracket = if position <= 0 {
        match ctx.current_first(store)? {
            Some(first) => Bracket {
                below: min,
                above: first,
                open_above: false,
            },
            None => Bracket {
                below: min,
                above: max,
                open_above: true,
            },
        }
    } else {
        let offset = usize::try_from(position - 1).unwrap_or(usize::MAX);
        let rows = store.query_ordered(ctx.filter(), SortOrder::Asc, Some(2), offset)?;
        match rows.as_slice() {
            [] => Bracket {
                below: ctx.current_last(store)?.unwrap_or(min),
                above: max,
                open_above: true,
            },
            [only] => Bracket {
                below: only.rank,
                above: max,
                open_above: true,
            },
            [before, after, ..] => Bracket {
                below: before.rank,
                above: after.rank,
                open_above: false,
            },
        }
    };
    trace!(
        position,
        below = bracket.below,
        above = bracket.above,
        open_above = bracket.open_above,
        "resolved neighbors"
    );
    ctx.set_bracket(bracket);
    Ok(bracket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::arith::{RankBounds, MAX_RANK, MIN_RANK};
    use crate::rank::position::Position;
    use crate::storage::{MemoryTable, RankFilter, ScopeFilter};
    use crate::types::ScopeKey;

    fn ctx_for(filter: RankFilter, position: i64) -> RankContext {
        RankContext::new(filter, RankBounds::default(), Position::At(position))
    }

    #[test]
    fn front_of_empty_scope_spans_range() -> Result<()> {
        let mut table = MemoryTable::default();
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), 0);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 0)?;
        assert_eq!((bracket.below, bracket.above), (MIN_RANK, MAX_RANK));
        Ok(())
    }

    #[test]
    fn front_brackets_against_lowest_rank() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(None, &[100, 200]);
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), -4);
        let bracket = resolve_neighbors(&mut ctx, &mut table, -4)?;
        assert_eq!((bracket.below, bracket.above), (MIN_RANK, 100));
        assert!(!bracket.open_above);
        Ok(())
    }

    #[test]
    fn interior_position_takes_two_neighbors() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(None, &[10, 20, 30, 40]);
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), 2);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 2)?;
        assert_eq!((bracket.below, bracket.above), (20, 30));
        Ok(())
    }

    #[test]
    fn last_row_leaves_bracket_open() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(None, &[10, 20]);
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), 2);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 2)?;
        assert_eq!((bracket.below, bracket.above), (20, MAX_RANK));
        assert!(bracket.open_above);
        Ok(())
    }

    #[test]
    fn past_the_end_falls_back_to_current_last() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(None, &[10, 20]);
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), 9);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 9)?;
        assert_eq!((bracket.below, bracket.above), (20, MAX_RANK));

        let mut empty = MemoryTable::default();
        let mut ctx = ctx_for(RankFilter::scope(ScopeFilter::Any), 9);
        let bracket = resolve_neighbors(&mut ctx, &mut empty, 9)?;
        assert_eq!((bracket.below, bracket.above), (MIN_RANK, MAX_RANK));
        Ok(())
    }

    #[test]
    fn record_being_moved_is_skipped() -> Result<()> {
        let mut table = MemoryTable::default();
        let ids = table.seed(None, &[10, 20, 30]);
        let filter = RankFilter::new(ScopeFilter::Any, Some(ids[1]));
        let mut ctx = ctx_for(filter, 1);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 1)?;
        assert_eq!((bracket.below, bracket.above), (10, 30));
        Ok(())
    }

    #[test]
    fn other_scopes_are_invisible() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(Some(ScopeKey::Int(1)), &[10, 20]);
        table.seed(Some(ScopeKey::Int(2)), &[15]);
        let filter = RankFilter::scope(ScopeFilter::Is(Some(ScopeKey::Int(1))));
        let mut ctx = ctx_for(filter, 1);
        let bracket = resolve_neighbors(&mut ctx, &mut table, 1)?;
        assert_eq!((bracket.below, bracket.above), (10, 20));
        Ok(())
    }
}
