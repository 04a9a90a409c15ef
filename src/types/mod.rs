#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Persisted ordering value. Ascending rank is the physical order of a scope.
pub type Rank = i64;

/// Identity of a persisted record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value)
    }
}

impl From<RecordId> for u64 {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

/// Value partitioning the ordering space.
///
/// Records whose scope keys differ are ranked independently and never compared.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeKey {
    /// Integer scope, typically a parent row id.
    Int(i64),
    /// Free-form text scope.
    Text(String),
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Int(v) => write!(f, "{v}"),
            ScopeKey::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ScopeKey {
    fn from(value: i64) -> Self {
        ScopeKey::Int(value)
    }
}

impl From<&str> for ScopeKey {
    fn from(value: &str) -> Self {
        ScopeKey::Text(value.to_owned())
    }
}

impl From<String> for ScopeKey {
    fn from(value: String) -> Self {
        ScopeKey::Text(value)
    }
}

impl FromStr for ScopeKey {
    type Err = RankError;

    /// Integers parse as [`ScopeKey::Int`], anything else as [`ScopeKey::Text`].
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(RankError::InvalidArgument("empty scope key".into()));
        }
        Ok(s.parse::<i64>()
            .map(ScopeKey::Int)
            .unwrap_or_else(|_| ScopeKey::Text(s.to_owned())))
    }
}

impl ToSql for ScopeKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            ScopeKey::Int(v) => v.to_sql(),
            ScopeKey::Text(v) => v.to_sql(),
        }
    }
}

impl FromSql for ScopeKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(v) => Ok(ScopeKey::Int(v)),
            ValueRef::Text(_) => value.as_str().map(|s| ScopeKey::Text(s.to_owned())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Direction in which a requested move left the representable rank range.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveErrorKind {
    /// The record could not be placed without exceeding the upper bound.
    TooLarge,
    /// The record could not be placed without going below the lower bound.
    TooSmall,
}

impl fmt::Display for MoveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveErrorKind::TooLarge => f.write_str("too_large"),
            MoveErrorKind::TooSmall => f.write_str("too_small"),
        }
    }
}

/// Errors raised by the rank engine and its backends.
#[derive(thiserror::Error, Debug)]
pub enum RankError {
    /// No rank inside the bounds could be found for the placement.
    #[error("invalid move: {kind}")]
    InvalidMove {
        /// Which side of the range ran out.
        kind: MoveErrorKind,
    },
    /// Failure reported by the SQLite backend.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No record with this id exists.
    #[error("record {0} not found")]
    NotFound(RecordId),
    /// Caller supplied a value the engine cannot use.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Configuration could not be read or parsed.
    #[error("config: {0}")]
    Config(String),
}

impl RankError {
    pub(crate) fn invalid_move(kind: MoveErrorKind) -> Self {
        RankError::InvalidMove { kind }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RankError>;
