use tracing::debug;

use super::backend::{Backend, RecordTxn};
use super::record::{NewRecord, Record, RecordChange};
use super::store::RankFilter;
use crate::admin::{verify_ranks, VerifyReport};
use crate::rank::{
    ChangeSet, Mutation, PendingRecord, PreCommitHook, RankEngine, RankOptions, RebalanceReport,
};
use crate::types::{RankError, RecordId, Result, ScopeKey};

/// A ranked collection of records.
///
/// Every mutation runs in one backend transaction: the hook resolves the
/// rank (shifting or rebalancing neighbors as needed), the record is written
/// with it, and the transaction commits only if all of that succeeded.
///
/// # Example
///
/// ```rust
/// use ranker::rank::{Position, RankOptions};
/// use ranker::storage::{Collection, MemoryBackend, NewRecord, RecordChange};
///
/// let mut todo = Collection::new(MemoryBackend::new(), RankOptions::default());
/// let milk = todo.insert(NewRecord::new("milk"))?;
/// let eggs = todo.insert(NewRecord::new("eggs"))?;
/// todo.update(eggs.id, RecordChange::default().position(Position::At(0)))?;
///
/// let labels: Vec<String> = todo.list(None)?.into_iter().map(|r| r.label).collect();
/// assert_eq!(labels, ["eggs", "milk"]);
/// assert_eq!(todo.ordinal(milk.id)?, Some(1));
/// # Ok::<(), ranker::types::RankError>(())
/// ```
#[derive(Debug)]
pub struct Collection<B: Backend, H: PreCommitHook = RankEngine> {
    backend: B,
    hook: H,
}

impl<B: Backend> Collection<B, RankEngine> {
    /// Creates a collection ranked by a [`RankEngine`] built from `options`.
    pub fn new(backend: B, options: RankOptions) -> Self {
        Self::with_hook(backend, RankEngine::new(options))
    }
}

impl<B: Backend, H: PreCommitHook> Collection<B, H> {
    /// Creates a collection ranked by a custom hook.
    pub fn with_hook(backend: B, hook: H) -> Self {
        Self { backend, hook }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The hook ranking every write.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Inserts a record at its requested position.
    pub fn insert(&mut self, record: NewRecord) -> Result<Record> {
        let mut txn = self.backend.begin()?;
        let pending = PendingRecord::new(record.scope.clone(), record.position);
        let rank = self
            .hook
            .before_commit(&mut txn, Mutation::Insert(&pending))?
            .ok_or_else(|| RankError::InvalidArgument("insert hook produced no rank".into()))?;
        let id = txn.insert_record(&record, rank)?;
        txn.commit()?;
        debug!(%id, rank, scope = ?record.scope, "inserted record");
        Ok(Record {
            id,
            scope: record.scope,
            rank,
            label: record.label,
        })
    }

    /// Applies `change` to an existing record.
    ///
    /// The rank is recomputed only when the change names a position or moves
    /// the record to another scope; otherwise it is left exactly as stored.
    pub fn update(&mut self, id: RecordId, change: RecordChange) -> Result<Record> {
        let mut txn = self.backend.begin()?;
        let mut record = txn.fetch(id)?.ok_or(RankError::NotFound(id))?;
        let changes = ChangeSet {
            position: change.position.is_some(),
            scope: self.hook.options().scoped
                && change.scope.as_ref().is_some_and(|scope| *scope != record.scope),
        };
        if let Some(scope) = change.scope {
            record.scope = scope;
        }
        if let Some(label) = change.label {
            record.label = label;
        }
        let pending = PendingRecord {
            id: Some(id),
            scope: record.scope.clone(),
            position: change.position.unwrap_or_default(),
        };
        if let Some(rank) = self.hook.before_commit(
            &mut txn,
            Mutation::Update {
                record: &pending,
                changes,
            },
        )? {
            record.rank = rank;
        }
        txn.update_record(&record)?;
        txn.commit()?;
        debug!(%id, rank = record.rank, ?changes, "updated record");
        Ok(record)
    }

    /// Removes a record. Remaining ranks are left untouched.
    pub fn delete(&mut self, id: RecordId) -> Result<bool> {
        let mut txn = self.backend.begin()?;
        self.hook.before_commit(&mut txn, Mutation::Delete(id))?;
        let removed = txn.delete_record(id)?;
        txn.commit()?;
        Ok(removed)
    }

    /// Loads one record.
    pub fn get(&mut self, id: RecordId) -> Result<Option<Record>> {
        self.backend.begin()?.fetch(id)
    }

    /// Records of one scope in rank order. `scope` is ignored when scoping is off.
    pub fn list(&mut self, scope: Option<&ScopeKey>) -> Result<Vec<Record>> {
        let filter = self.hook.options().scope_filter(scope);
        self.backend.begin()?.list(&filter)
    }

    /// Zero-based place of a record within its scope.
    pub fn ordinal(&mut self, id: RecordId) -> Result<Option<usize>> {
        let mut txn = self.backend.begin()?;
        let Some(record) = txn.fetch(id)? else {
            return Ok(None);
        };
        let filter = self.hook.options().scope_filter(record.scope.as_ref());
        Ok(txn.list(&filter)?.iter().position(|r| r.id == id))
    }

    /// Respaces one scope evenly across the rank range.
    pub fn rebalance(&mut self, scope: Option<&ScopeKey>) -> Result<RebalanceReport> {
        let filter = RankFilter::scope(self.hook.options().scope_filter(scope));
        let mut txn = self.backend.begin()?;
        let report = self.hook.rebalance(&mut txn, &filter)?;
        txn.commit()?;
        Ok(report)
    }

    /// Checks rank uniqueness and bounds in every scope.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        let mut txn = self.backend.begin()?;
        verify_ranks(&mut txn, self.hook.options())
    }
}
