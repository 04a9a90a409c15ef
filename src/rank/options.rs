use serde::{Deserialize, Serialize};

use super::arith::RankBounds;
use crate::storage::ScopeFilter;
use crate::types::ScopeKey;

/// Configuration for a [`super::RankEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    /// Range of ranks available to every scope.
    pub bounds: RankBounds,
    /// Whether records are partitioned by their scope key. When disabled the
    /// whole collection is a single ordering space.
    pub scoped: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            bounds: RankBounds::default(),
            scoped: true,
        }
    }
}

impl RankOptions {
    /// Sets the rank range.
    pub fn bounds(mut self, bounds: RankBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Enables or disables partitioning by scope key.
    pub fn scoped(mut self, enabled: bool) -> Self {
        self.scoped = enabled;
        self
    }

    /// Filter selecting the ordering space a record with `scope` belongs to.
    pub fn scope_filter(&self, scope: Option<&ScopeKey>) -> ScopeFilter {
        if self.scoped {
            ScopeFilter::Is(scope.cloned())
        } else {
            ScopeFilter::Any
        }
    }
}
