use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Hooks for observing what the rank engine does.
///
/// Implementations collect how often placements conflict and how many rows
/// shifts and rebalances rewrite, which is the cost the engine tries to keep low.
pub trait RankMetrics: Send + Sync {
    /// A candidate rank was computed.
    ///
    /// # Parameters
    /// * `kind` - The dispatch branch: "last", "middle", "at" or "unset".
    fn rank_assigned(&self, kind: &'static str);

    /// A candidate collided with another record or left the range.
    fn conflict_detected(&self);

    /// A contiguous band was shifted to open a slot.
    ///
    /// # Parameters
    /// * `direction` - "up" or "down".
    /// * `rows` - Number of other records rewritten.
    fn shifted(&self, direction: &'static str, rows: usize);

    /// A scope was respaced evenly across the range.
    fn rebalanced(&self, rows: usize);
}

/// Discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl RankMetrics for NoopMetrics {
    fn rank_assigned(&self, _kind: &'static str) {}
    fn conflict_detected(&self) {}
    fn shifted(&self, _direction: &'static str, _rows: usize) {}
    fn rebalanced(&self, _rows: usize) {}
}

/// Thread-safe atomic counters.
#[derive(Default)]
pub struct CounterMetrics {
    /// Candidates computed.
    pub assignments: AtomicU64,
    /// Candidates that needed resolution.
    pub conflicts: AtomicU64,
    /// Shift-up operations.
    pub shifts_up: AtomicU64,
    /// Shift-down operations.
    pub shifts_down: AtomicU64,
    /// Full rebalances.
    pub rebalances: AtomicU64,
    /// Rows rewritten by shifts and rebalances combined.
    pub rows_rewritten: AtomicU64,
}

/// Point-in-time copy of [`CounterMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RankMetricsSnapshot {
    /// Ranks resolved.
    pub assignments: u64,
    /// Candidates that were already taken or out of range.
    pub conflicts: u64,
    /// Upward shifts of an upper band.
    pub shifts_up: u64,
    /// Downward shifts at the ceiling.
    pub shifts_down: u64,
    /// Full respacings of a scope.
    pub rebalances: u64,
    /// Rows rewritten by shifts and rebalances.
    pub rows_rewritten: u64,
}

impl CounterMetrics {
    /// Reads every counter.
    pub fn snapshot(&self) -> RankMetricsSnapshot {
        RankMetricsSnapshot {
            assignments: self.assignments.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            shifts_up: self.shifts_up.load(Ordering::Relaxed),
            shifts_down: self.shifts_down.load(Ordering::Relaxed),
            rebalances: self.rebalances.load(Ordering::Relaxed),
            rows_rewritten: self.rows_rewritten.load(Ordering::Relaxed),
        }
    }
}

impl RankMetrics for CounterMetrics {
    fn rank_assigned(&self, _kind: &'static str) {
        self.assignments.fetch_add(1, Ordering::Relaxed);
    }

    fn conflict_detected(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    fn shifted(&self, direction: &'static str, rows: usize) {
        match direction {
            "up" => {
                self.shifts_up.fetch_add(1, Ordering::Relaxed);
            }
            "down" => {
                self.shifts_down.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        self.rows_rewritten
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    fn rebalanced(&self, rows: usize) {
        self.rebalances.fetch_add(1, Ordering::Relaxed);
        self.rows_rewritten
            .fetch_add(rows as u64, Ordering::Relaxed);
    }
}

/// Returns the default no-op metrics sink.
pub fn default_metrics() -> Arc<dyn RankMetrics> {
    Arc::new(NoopMetrics)
}
