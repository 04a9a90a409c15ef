//! In-memory backend.
//!
//! A `BTreeMap` table behind a mutex. Transactions hold the lock for their
//! whole lifetime and work on a staged copy, so they are serializable and a
//! dropped transaction leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::backend::{Backend, RecordTxn};
use super::record::{NewRecord, Record};
use super::store::{RankFilter, RankPredicate, RankStore, RankedRow, ScopeFilter, SortOrder};
use crate::types::{Rank, RankError, RecordId, Result, ScopeKey};

#[derive(Clone, Debug, PartialEq, Eq)]
struct MemoryRow {
    scope: Option<ScopeKey>,
    rank: Rank,
    label: String,
}

/// A table of ranked rows.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
    rows: BTreeMap<RecordId, MemoryRow>,
    next_id: u64,
}

impl MemoryTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current rank of `id`.
    pub fn rank_of(&self, id: RecordId) -> Option<Rank> {
        self.rows.get(&id).map(|row| row.rank)
    }

    /// Inserts rows with the given ranks directly, bypassing rank assignment.
    ///
    /// Meant for fixtures that need a specific starting layout.
    pub fn seed(&mut self, scope: Option<ScopeKey>, ranks: &[Rank]) -> Vec<RecordId> {
        ranks
            .iter()
            .map(|&rank| {
                self.push(MemoryRow {
                    scope: scope.clone(),
                    rank,
                    label: String::new(),
                })
            })
            .collect()
    }

    fn push(&mut self, row: MemoryRow) -> RecordId {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.rows.insert(id, row);
        id
    }

    fn selected<'a>(&'a self, filter: &'a RankFilter) -> impl Iterator<Item = RankedRow> + 'a {
        self.rows
            .iter()
            .filter(move |(id, row)| filter.matches(**id, row.scope.as_ref()))
            .map(|(id, row)| RankedRow {
                id: *id,
                rank: row.rank,
            })
    }

    fn record(id: RecordId, row: &MemoryRow) -> Record {
        Record {
            id,
            scope: row.scope.clone(),
            rank: row.rank,
            label: row.label.clone(),
        }
    }

    fn row_mut(&mut self, id: RecordId) -> Result<&mut MemoryRow> {
        self.rows.get_mut(&id).ok_or(RankError::NotFound(id))
    }
}

impl RankStore for MemoryTable {
    fn query_ordered(
        &mut self,
        filter: &RankFilter,
        order: SortOrder,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankedRow>> {
        let mut rows: Vec<RankedRow> = self.selected(filter).collect();
        rows.sort_by_key(|row| (row.rank, row.id));
        if order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn query_exact(&mut self, filter: &RankFilter, rank: Rank) -> Result<Option<RankedRow>> {
        Ok(self.selected(filter).find(|row| row.rank == rank))
    }

    fn query_extreme(&mut self, filter: &RankFilter, order: SortOrder) -> Result<Option<Rank>> {
        let ranks = self.selected(filter).map(|row| row.rank);
        Ok(match order {
            SortOrder::Asc => ranks.min(),
            SortOrder::Desc => ranks.max(),
        })
    }

    fn bulk_increment(
        &mut self,
        filter: &RankFilter,
        predicate: RankPredicate,
        delta: i64,
    ) -> Result<usize> {
        let mut touched = 0;
        for (id, row) in self.rows.iter_mut() {
            if filter.matches(*id, row.scope.as_ref()) && predicate.matches(row.rank) {
                row.rank += delta;
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn write_rank(&mut self, id: RecordId, rank: Rank) -> Result<()> {
        self.row_mut(id)?.rank = rank;
        Ok(())
    }
}

/// Shared handle to an in-memory table.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    table: Arc<Mutex<MemoryTable>>,
}

impl MemoryBackend {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed table.
    pub fn snapshot(&self) -> MemoryTable {
        self.table.lock().clone()
    }
}

impl Backend for MemoryBackend {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&mut self) -> Result<MemoryTxn<'_>> {
        let guard = self.table.lock();
        let staged = guard.clone();
        Ok(MemoryTxn { guard, staged })
    }
}

/// Serializable transaction over a [`MemoryBackend`].
pub struct MemoryTxn<'a> {
    guard: MutexGuard<'a, MemoryTable>,
    staged: MemoryTable,
}

impl RankStore for MemoryTxn<'_> {
    fn query_ordered(
        &mut self,
        filter: &RankFilter,
        order: SortOrder,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankedRow>> {
        self.staged.query_ordered(filter, order, limit, offset)
    }

    fn query_exact(&mut self, filter: &RankFilter, rank: Rank) -> Result<Option<RankedRow>> {
        self.staged.query_exact(filter, rank)
    }

    fn query_extreme(&mut self, filter: &RankFilter, order: SortOrder) -> Result<Option<Rank>> {
        self.staged.query_extreme(filter, order)
    }

    fn bulk_increment(
        &mut self,
        filter: &RankFilter,
        predicate: RankPredicate,
        delta: i64,
    ) -> Result<usize> {
        self.staged.bulk_increment(filter, predicate, delta)
    }

    fn write_rank(&mut self, id: RecordId, rank: Rank) -> Result<()> {
        self.staged.write_rank(id, rank)
    }
}

impl RecordTxn for MemoryTxn<'_> {
    fn fetch(&mut self, id: RecordId) -> Result<Option<Record>> {
        Ok(self
            .staged
            .rows
            .get(&id)
            .map(|row| MemoryTable::record(id, row)))
    }

    fn insert_record(&mut self, record: &NewRecord, rank: Rank) -> Result<RecordId> {
        Ok(self.staged.push(MemoryRow {
            scope: record.scope.clone(),
            rank,
            label: record.label.clone(),
        }))
    }

    fn update_record(&mut self, record: &Record) -> Result<()> {
        let row = self.staged.row_mut(record.id)?;
        row.scope = record.scope.clone();
        row.rank = record.rank;
        row.label = record.label.clone();
        Ok(())
    }

    fn delete_record(&mut self, id: RecordId) -> Result<bool> {
        Ok(self.staged.rows.remove(&id).is_some())
    }

    fn list(&mut self, scope: &ScopeFilter) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self
            .staged
            .rows
            .iter()
            .filter(|(_, row)| scope.matches(row.scope.as_ref()))
            .map(|(id, row)| MemoryTable::record(*id, row))
            .collect();
        records.sort_by_key(|record| (record.rank, record.id));
        Ok(records)
    }

    fn scopes(&mut self) -> Result<Vec<Option<ScopeKey>>> {
        let scopes: BTreeSet<Option<ScopeKey>> = self
            .staged
            .rows
            .values()
            .map(|row| row.scope.clone())
            .collect();
        Ok(scopes.into_iter().collect())
    }

    fn commit(mut self) -> Result<()> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_transaction_rolls_back() -> Result<()> {
        let mut backend = MemoryBackend::new();
        {
            let mut txn = backend.begin()?;
            txn.insert_record(&NewRecord::new("a"), 0)?;
        }
        assert!(backend.snapshot().is_empty());

        let mut txn = backend.begin()?;
        let id = txn.insert_record(&NewRecord::new("a"), 0)?;
        txn.commit()?;
        assert_eq!(backend.snapshot().rank_of(id), Some(0));
        Ok(())
    }

    #[test]
    fn bulk_increment_respects_filter_and_predicate() -> Result<()> {
        let mut table = MemoryTable::default();
        let ids = table.seed(Some(ScopeKey::Int(1)), &[1, 2, 3]);
        let other = table.seed(Some(ScopeKey::Int(2)), &[2]);
        let filter = RankFilter::new(ScopeFilter::Is(Some(ScopeKey::Int(1))), Some(ids[2]));
        let touched = table.bulk_increment(&filter, RankPredicate::AtLeast(2), 1)?;
        assert_eq!(touched, 1);
        assert_eq!(table.rank_of(ids[1]), Some(3));
        assert_eq!(table.rank_of(ids[2]), Some(3));
        assert_eq!(table.rank_of(other[0]), Some(2));
        Ok(())
    }

    #[test]
    fn ordered_query_pages_in_both_directions() -> Result<()> {
        let mut table = MemoryTable::default();
        table.seed(None, &[30, 10, 20]);
        let filter = RankFilter::scope(ScopeFilter::Any);
        let asc = table.query_ordered(&filter, SortOrder::Asc, Some(2), 1)?;
        assert_eq!(asc.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![20, 30]);
        let desc = table.query_ordered(&filter, SortOrder::Desc, Some(1), 0)?;
        assert_eq!(desc[0].rank, 30);
        Ok(())
    }

    #[test]
    fn writing_unknown_record_fails() {
        let mut table = MemoryTable::default();
        assert!(matches!(
            table.write_rank(RecordId(99), 1),
            Err(RankError::NotFound(RecordId(99)))
        ));
    }
}
