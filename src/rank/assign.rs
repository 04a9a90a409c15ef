use tracing::debug;

use super::context::{Bracket, RankContext};
use super::neighbors::resolve_neighbors;
use super::position::Position;
use crate::storage::RankStore;
use crate::types::{Rank, Result};

/// Computes the candidate rank for the context's position.
///
/// The candidate is not final: conflict detection still has to clear it.
pub fn candidate_rank<S: RankStore + ?Sized>(ctx: &mut RankContext, store: &mut S) -> Result<Rank> {
    let position = ctx.position();
    let rank = dispatch(ctx, store, position)?;
    debug!(position = %position, candidate = rank, "assigned candidate rank");
    Ok(rank)
}

fn dispatch<S: RankStore + ?Sized>(
    ctx: &mut RankContext,
    store: &mut S,
    position: Position,
) -> Result<Rank> {
    let bounds = *ctx.bounds();
    match position {
        Position::Unset => dispatch(ctx, store, Position::Last),
        Position::Last => match ctx.current_last(store)? {
            Some(last) => {
                ctx.set_bracket(Bracket {
                    below: last,
                    above: bounds.max(),
                    open_above: true,
                });
                Ok(bounds.between(None, Some(last)))
            }
            None => dispatch(ctx, store, Position::Middle),
        },
        Position::Middle => {
            ctx.set_bracket(Bracket {
                below: bounds.min(),
                above: bounds.max(),
                open_above: false,
            });
            Ok(bounds.midpoint())
        }
        Position::At(offset) => {
            let bracket = resolve_neighbors(ctx, store, offset)?;
            Ok(bounds.between(Some(bracket.above), Some(bracket.below)))
        }
    }
}
