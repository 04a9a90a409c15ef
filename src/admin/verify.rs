use serde::Serialize;
use tracing::debug;

use crate::rank::{RankOptions, Spacing};
use crate::storage::{RecordTxn, ScopeFilter};
use crate::types::{Result, ScopeKey};

const MAX_FINDINGS: usize = 32;

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Condition that will make future placements fail.
    Warning,
    /// Broken ordering invariant.
    Error,
}

/// Represents a single issue discovered during verification.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyFinding {
    /// Whether the finding fails verification.
    pub severity: VerifySeverity,
    /// Scope the finding belongs to; `None` for unscoped records.
    pub scope: Option<ScopeKey>,
    /// Human-readable description.
    pub message: String,
}

/// Statistics collected during verification.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyCounts {
    /// Ordering spaces checked.
    pub scopes: u64,
    /// Records checked across all scopes.
    pub records: u64,
    /// Ranks held by more than one record of a scope.
    pub duplicate_ranks: u64,
    /// Records ranked outside the configured bounds.
    pub out_of_bounds: u64,
}

/// Complete report of a verification pass.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    /// No error-level findings. Warnings do not fail verification.
    pub success: bool,
    /// At most 32 findings; `counts` stays exact beyond that.
    pub findings: Vec<VerifyFinding>,
    /// Totals over the whole pass.
    pub counts: VerifyCounts,
}

/// Checks every ordering space for duplicate and out-of-range ranks.
///
/// With scoping disabled the whole table is checked as one space.
pub fn verify_ranks<T: RecordTxn + ?Sized>(
    txn: &mut T,
    options: &RankOptions,
) -> Result<VerifyReport> {
    let spaces: Vec<(Option<ScopeKey>, ScopeFilter)> = if options.scoped {
        txn.scopes()?
            .into_iter()
            .map(|scope| (scope.clone(), ScopeFilter::Is(scope)))
            .collect()
    } else {
        vec![(None, ScopeFilter::Any)]
    };

    let bounds = options.bounds;
    let mut findings = Vec::new();
    let mut counts = VerifyCounts::default();
    let mut failed = false;

    for (scope, filter) in spaces {
        let records = txn.list(&filter)?;
        counts.scopes += 1;
        counts.records += records.len() as u64;

        for pair in records.windows(2) {
            if pair[0].rank == pair[1].rank {
                counts.duplicate_ranks += 1;
                failed = true;
                push_finding(
                    &mut findings,
                    VerifySeverity::Error,
                    &scope,
                    format!(
                        "records {} and {} share rank {}",
                        pair[0].id, pair[1].id, pair[0].rank
                    ),
                );
            }
        }

        for record in records.iter().filter(|r| !bounds.contains(r.rank)) {
            counts.out_of_bounds += 1;
            failed = true;
            push_finding(
                &mut findings,
                VerifySeverity::Error,
                &scope,
                format!(
                    "record {} has rank {} outside [{}, {}]",
                    record.id,
                    record.rank,
                    bounds.min(),
                    bounds.max()
                ),
            );
        }

        if Spacing::new(&bounds, records.len() + 1).is_err() {
            push_finding(
                &mut findings,
                VerifySeverity::Warning,
                &scope,
                format!("scope is full at {} records", records.len()),
            );
        }
    }

    debug!(
        scopes = counts.scopes,
        records = counts.records,
        findings = findings.len(),
        "verified ranks"
    );
    Ok(VerifyReport {
        success: !failed,
        findings,
        counts,
    })
}

fn push_finding(
    findings: &mut Vec<VerifyFinding>,
    severity: VerifySeverity,
    scope: &Option<ScopeKey>,
    message: String,
) {
    if findings.len() < MAX_FINDINGS {
        findings.push(VerifyFinding {
            severity,
            scope: scope.clone(),
            message,
        });
    }
}
