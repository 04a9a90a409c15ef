#![forbid(unsafe_code)]

//! Maintenance utilities.
//!
//! Integrity verification of stored ranks. Respacing lives with the rank
//! engine as [`crate::rank::rebalance_scope`].

mod verify;

/// Rank integrity verification.
///
/// Checks every scope for duplicate and out-of-range ranks and reports what it found.
pub use verify::{verify_ranks, VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity};
