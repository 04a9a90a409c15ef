use serde::{Deserialize, Serialize};

use crate::rank::Position;
use crate::types::{Rank, RecordId, ScopeKey};

/// A persisted, ranked record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity assigned by the backend.
    pub id: RecordId,
    /// Ordering space; `None` for unscoped records.
    pub scope: Option<ScopeKey>,
    /// Position within the scope; unique per scope.
    pub rank: Rank,
    /// Free-form payload.
    pub label: String,
}

/// A record to be inserted. Its rank is derived from `position`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewRecord {
    /// Ordering space to join.
    pub scope: Option<ScopeKey>,
    /// Free-form payload.
    pub label: String,
    /// Defaults to appending.
    pub position: Position,
}

impl NewRecord {
    /// A record with `label`, appended to the unscoped space.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Places the record in `scope`.
    pub fn scope(mut self, scope: impl Into<ScopeKey>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Requests a position.
    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Fields to change on an existing record. `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordChange {
    /// New label.
    pub label: Option<String>,
    /// `Some(None)` moves the record out of any scope.
    pub scope: Option<Option<ScopeKey>>,
    /// Moves the record within its scope.
    pub position: Option<Position>,
}

impl RecordChange {
    /// Replaces the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Moves the record to another scope.
    pub fn scope(mut self, scope: Option<ScopeKey>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Requests a new position.
    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}
