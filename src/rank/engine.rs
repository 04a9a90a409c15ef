use std::sync::Arc;

use tracing::{debug, trace};

use super::assign::candidate_rank;
use super::conflict::{detect_conflict, rebalance_scope, shift_ranks, RebalanceReport};
use super::context::RankContext;
use super::metrics::{default_metrics, RankMetrics};
use super::options::RankOptions;
use super::position::Position;
use crate::storage::{RankFilter, RankStore};
use crate::types::{Rank, RecordId, Result, ScopeKey};

/// The fields of a record the engine reads when placing it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingRecord {
    /// Absent until the record has been persisted once.
    pub id: Option<RecordId>,
    /// Ordering space the record joins.
    pub scope: Option<ScopeKey>,
    /// Where the record should go.
    pub position: Position,
}

impl PendingRecord {
    /// A record that has not been persisted yet.
    pub fn new(scope: Option<ScopeKey>, position: Position) -> Self {
        Self {
            id: None,
            scope,
            position,
        }
    }

    /// Marks the record as already persisted under `id`.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Which rank-relevant fields an update touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// A position was requested.
    pub position: bool,
    /// The scope key changed value.
    pub scope: bool,
}

impl ChangeSet {
    /// Whether the record needs a new rank.
    pub fn touches_rank(&self) -> bool {
        self.position || self.scope
    }
}

/// A record write about to be committed.
#[derive(Clone, Copy, Debug)]
pub enum Mutation<'a> {
    /// A new record.
    Insert(&'a PendingRecord),
    /// An existing record with the fields that changed.
    Update {
        /// Record after the change.
        record: &'a PendingRecord,
        /// Fields that changed.
        changes: ChangeSet,
    },
    /// A record about to be removed.
    Delete(RecordId),
}

/// Callback a persistence layer runs before it writes a record.
///
/// Runs inside the write's transaction. The returned rank, if any, must be
/// added to the same write.
pub trait PreCommitHook {
    /// Returns the rank to store, or `None` to leave it alone.
    fn before_commit(&self, store: &mut dyn RankStore, mutation: Mutation<'_>)
        -> Result<Option<Rank>>;

    /// Bounds and scoping the hook ranks against.
    fn options(&self) -> &RankOptions;

    /// Respaces one scope outside of any record mutation.
    fn rebalance(&self, store: &mut dyn RankStore, filter: &RankFilter) -> Result<RebalanceReport>;
}

/// Rank assignment and rebalancing engine.
///
/// Stateless between calls; each placement builds its own [`RankContext`].
#[derive(Clone)]
pub struct RankEngine {
    options: RankOptions,
    metrics: Arc<dyn RankMetrics>,
}

impl Default for RankEngine {
    fn default() -> Self {
        Self::new(RankOptions::default())
    }
}

impl std::fmt::Debug for RankEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RankEngine {
    /// Creates an engine that reports to no metrics sink.
    pub fn new(options: RankOptions) -> Self {
        Self {
            options,
            metrics: default_metrics(),
        }
    }

    /// Attaches a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn RankMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Bounds and scoping in use.
    pub fn options(&self) -> &RankOptions {
        &self.options
    }

    /// Resolves the rank of a record about to be inserted.
    pub fn rank_for_insert<S: RankStore + ?Sized>(
        &self,
        store: &mut S,
        record: &PendingRecord,
    ) -> Result<Rank> {
        self.place(store, record)
    }

    /// Resolves the rank of a record about to be updated.
    ///
    /// Returns `None` when the update leaves position and scope alone, in
    /// which case the stored rank must not change.
    pub fn rank_for_update<S: RankStore + ?Sized>(
        &self,
        store: &mut S,
        record: &PendingRecord,
        changes: ChangeSet,
    ) -> Result<Option<Rank>> {
        if !changes.touches_rank() {
            trace!(id = ?record.id, "update leaves rank untouched");
            return Ok(None);
        }
        self.place(store, record).map(Some)
    }

    fn place<S: RankStore + ?Sized>(&self, store: &mut S, record: &PendingRecord) -> Result<Rank> {
        let filter = RankFilter::new(
            self.options.scope_filter(record.scope.as_ref()),
            record.id,
        );
        let mut ctx = RankContext::new(filter, self.options.bounds, record.position);

        let candidate = candidate_rank(&mut ctx, store)?;
        self.metrics.rank_assigned(record.position.kind());
        if !detect_conflict(&ctx, store, candidate)? {
            return Ok(candidate);
        }

        debug!(id = ?record.id, scope = ?record.scope, candidate, "rank conflict");
        self.metrics.conflict_detected();
        let rank = shift_ranks(&mut ctx, store, candidate, self.metrics.as_ref())?;
        self.options.bounds.check(rank)
    }
}

impl PreCommitHook for RankEngine {
    fn before_commit(
        &self,
        store: &mut dyn RankStore,
        mutation: Mutation<'_>,
    ) -> Result<Option<Rank>> {
        match mutation {
            Mutation::Insert(record) => self.rank_for_insert(store, record).map(Some),
            Mutation::Update { record, changes } => self.rank_for_update(store, record, changes),
            // Gaps left behind are inert.
            Mutation::Delete(id) => {
                trace!(%id, "delete needs no rank maintenance");
                Ok(None)
            }
        }
    }

    fn options(&self) -> &RankOptions {
        &self.options
    }

    fn rebalance(&self, store: &mut dyn RankStore, filter: &RankFilter) -> Result<RebalanceReport> {
        rebalance_scope(store, filter, &self.options.bounds, self.metrics.as_ref())
    }
}
