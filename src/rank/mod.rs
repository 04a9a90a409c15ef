//! Rank assignment and rebalancing.
//!
//! Translates a requested [`Position`] into a [`crate::types::Rank`] that keeps
//! every scope uniquely and monotonically ordered, rewriting as few other
//! records as possible when the natural candidate is taken.

mod arith;
mod assign;
mod conflict;
mod context;
mod engine;
mod metrics;
mod neighbors;
mod options;
mod position;


pub use arith::{rank_between, RankBounds, Spacing, MAX_RANK, MIN_RANK};
pub use assign::candidate_rank;
pub use conflict::{detect_conflict, rebalance_ranks, rebalance_scope, shift_ranks, RebalanceReport};
pub use context::{Bracket, RankContext};
pub use engine::{ChangeSet, Mutation, PendingRecord, PreCommitHook, RankEngine};
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, RankMetrics, RankMetricsSnapshot};
pub use neighbors::resolve_neighbors;
pub use options::RankOptions;
pub use position::Position;
