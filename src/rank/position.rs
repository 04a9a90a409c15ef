use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{RankError, Result};

/// Where a caller wants a record to sit within its scope.
///
/// Integer positions count from zero: `At(0)` (or any negative value) places
/// the record in front, `At(n)` places it after the first `n` other records.
/// Positions past the end append.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// No intent given; new records append.
    #[default]
    Unset,
    /// After every other record in scope.
    Last,
    /// Bisection of the whole rank range. Meant for the first record of a scope.
    Middle,
    /// Explicit ordinal offset.
    At(i64),
}

impl Position {
    /// Name of the dispatch branch, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Position::Unset => "unset",
            Position::Last => "last",
            Position::Middle => "middle",
            Position::At(_) => "at",
        }
    }
}

impl From<i64> for Position {
    fn from(value: i64) -> Self {
        Position::At(value)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::At(offset) => write!(f, "{offset}"),
            other => f.write_str(other.kind()),
        }
    }
}

impl FromStr for Position {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unset" => Ok(Position::Unset),
            "last" => Ok(Position::Last),
            "middle" => Ok(Position::Middle),
            "first" => Ok(Position::At(0)),
            other => other
                .parse::<i64>()
                .map(Position::At)
                .map_err(|_| RankError::InvalidArgument(format!("unknown position '{s}'"))),
        }
    }
}
