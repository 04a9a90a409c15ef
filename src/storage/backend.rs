use super::record::{NewRecord, Record};
use super::store::{RankStore, ScopeFilter};
use crate::types::{Rank, RecordId, Result, ScopeKey};

/// A persistence layer able to open atomic units of work.
pub trait Backend {
    /// Transaction handle borrowing the backend.
    type Txn<'a>: RecordTxn
    where
        Self: 'a;

    /// Starts a transaction. Dropping it without [`RecordTxn::commit`] rolls back.
    fn begin(&mut self) -> Result<Self::Txn<'_>>;
}

/// Record-level operations available inside a backend transaction.
///
/// Rank queries and shifts issued through the [`RankStore`] supertrait run
/// in the same transaction as the record writes.
pub trait RecordTxn: RankStore {
    /// Loads one record.
    fn fetch(&mut self, id: RecordId) -> Result<Option<Record>>;

    /// Inserts `record` with its resolved rank and returns the new identity.
    fn insert_record(&mut self, record: &NewRecord, rank: Rank) -> Result<RecordId>;

    /// Overwrites scope, rank and label of an existing record.
    fn update_record(&mut self, record: &Record) -> Result<()>;

    /// Removes a record. Returns whether it existed.
    fn delete_record(&mut self, id: RecordId) -> Result<bool>;

    /// Records selected by `scope`, ascending by rank.
    fn list(&mut self, scope: &ScopeFilter) -> Result<Vec<Record>>;

    /// Every distinct scope key present, including `None` when unscoped rows exist.
    fn scopes(&mut self) -> Result<Vec<Option<ScopeKey>>>;

    /// Makes every write of the transaction durable.
    fn commit(self) -> Result<()>;
}
