//! Persistence for ranked records.
//!
//! Backends implement [`RankStore`] for the rank engine's queries and
//! [`RecordTxn`] for record writes, both inside one transaction per mutation.

/// Generic ranked collection over any backend.
mod collection;

/// Backend and transaction traits.
mod backend;

/// In-memory backend for tests and embedding.
mod memory;

/// Record types.
mod record;

/// SQLite backend.
mod sqlite;

/// Rank storage primitives the engine is written against.
mod store;

pub use backend::{Backend, RecordTxn};
pub use collection::Collection;
pub use memory::{MemoryBackend, MemoryTable, MemoryTxn};
pub use record::{NewRecord, Record, RecordChange};
pub use sqlite::{validate_identifier, SqliteBackend, SqliteTxn, DEFAULT_TABLE};
pub use store::{RankFilter, RankPredicate, RankStore, RankedRow, ScopeFilter, SortOrder};
