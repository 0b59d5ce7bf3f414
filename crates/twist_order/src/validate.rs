//! Linear extension checking for audit logs.

use crate::causal::CausalOrder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{error, info};
use twist_core::{AuditEntry, RequestId};

/// An audit entry completed before one of its causal dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalOrderViolation {
    /// 1-based position in the audit log
    pub position: usize,
    /// Request completed too early
    pub id: RequestId,
    /// Dependencies not yet completed at that point
    pub missing: BTreeSet<RequestId>,
}

impl std::fmt::Display for CausalOrderViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "entry {}: request {} completed before {}",
            self.position,
            self.id,
            join(&self.missing)
        )
    }
}

/// Problem found while scanning an audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Finding {
    /// Completion order contradicts the trace
    Violation(CausalOrderViolation),
    /// Audit log names a request the trace never opened
    UnknownRequest {
        /// 1-based position in the audit log
        position: usize,
        /// Offending request
        id: RequestId,
    },
    /// Audit log names a request a second time
    DuplicateEntry {
        /// 1-based position of the repeat
        position: usize,
        /// Offending request
        id: RequestId,
    },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Violation(v) => write!(f, "{}", v),
            Self::UnknownRequest { position, id } => {
                write!(f, "entry {}: request {} is not in the trace", position, id)
            }
            Self::DuplicateEntry { position, id } => {
                write!(f, "entry {}: request {} already completed earlier", position, id)
            }
        }
    }
}

/// Result of checking one audit log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderReport {
    /// Entries scanned
    pub checked: usize,
    /// Every problem found, in log order
    pub findings: Vec<Finding>,
}

impl OrderReport {
    /// True iff no findings were recorded
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// Only the causal order violations
    pub fn violations(&self) -> impl Iterator<Item = &CausalOrderViolation> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Violation(v) => Some(v),
            _ => None,
        })
    }
}

/// Validator for audit log completion orders
pub struct OrderValidator<'a> {
    order: &'a CausalOrder,
}

impl<'a> OrderValidator<'a> {
    /// Create a validator over an extracted causal order
    #[must_use]
    pub fn new(order: &'a CausalOrder) -> Self {
        Self { order }
    }

    /// Check that `entries` is a linear extension of the causal order
    ///
    /// The whole log is always scanned. A request counts as completed once its
    /// entry has been checked, whether or not the entry itself passed, so
    /// later entries are judged against the actual history.
    #[must_use]
    pub fn validate(&self, entries: &[AuditEntry]) -> OrderReport {
        let mut report = OrderReport::default();
        let mut happened: BTreeSet<RequestId> = BTreeSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let position = index + 1;
            let id = entry.id;
            report.checked += 1;

            let Some(expected) = self.order.dependencies(id) else {
                error!(id = %id, position, "request is not in the trace");
                report.findings.push(Finding::UnknownRequest { position, id });
                continue;
            };

            if happened.contains(&id) {
                error!(id = %id, position, "request completed twice");
                report.findings.push(Finding::DuplicateEntry { position, id });
                continue;
            }

            let missing: BTreeSet<RequestId> = expected.difference(&happened).copied().collect();
            if missing.is_empty() {
                info!("{}: {} is subset of {}", id, join(expected), join(&happened));
            } else {
                error!("{}: {} is not subset of {}", id, join(expected), join(&happened));
                report
                    .findings
                    .push(Finding::Violation(CausalOrderViolation { position, id, missing }));
            }

            happened.insert(id);
        }

        report
    }
}

fn join(ids: &BTreeSet<RequestId>) -> String {
    let inner: Vec<String> = ids.iter().map(ToString::to_string).collect();
    format!("{{{}}}", inner.join(", "))
}
