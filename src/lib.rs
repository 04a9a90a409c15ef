//! Ordered collections backed by integer ranks.
//!
//! Records carry a bounded integer rank; listing a scope in rank order gives
//! its user-defined order. Placing a record at a position picks a rank by
//! bisecting its neighbors and only rewrites other records when that rank is
//! already taken or out of range.

#![warn(missing_docs)]

/// Maintenance utilities.
pub mod admin;
/// TOML configuration.
pub mod config;
/// Rank assignment and rebalancing engine.
pub mod rank;
/// Backends and the ranked collection.
pub mod storage;
/// Identifiers, scope keys and errors.
pub mod types;

pub use config::RankerConfig;
pub use rank::{Position, RankEngine, RankOptions};
pub use storage::{Collection, MemoryBackend, NewRecord, Record, RecordChange, SqliteBackend};
pub use types::{RankError, RecordId, Result, ScopeKey};
