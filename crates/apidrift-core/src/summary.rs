//! Summary reduction over a findings list

use crate::finding::{BreakingChange, ChangeCategory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary statistics for a set of breaking changes
///
/// Derived on demand from a findings list; has no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChangeSummary {
    /// Total number of findings
    pub total: usize,

    /// Counts per severity
    pub by_severity: HashMap<Severity, usize>,

    /// Counts per category
    pub by_category: HashMap<ChangeCategory, usize>,

    /// Number of critical findings
    pub critical_count: usize,
}

impl ChangeSummary {
    /// Fold a findings list into counts
    ///
    /// An empty input yields all-zero counts with empty breakdown maps.
    pub fn from_changes(changes: &[BreakingChange]) -> Self {
        let mut summary = Self::default();

        for change in changes {
            *summary.by_severity.entry(change.severity).or_insert(0) += 1;
            *summary.by_category.entry(change.category).or_insert(0) += 1;
        }

        summary.total = changes.len();
        summary.critical_count = summary
            .by_severity
            .get(&Severity::Critical)
            .copied()
            .unwrap_or(0);

        summary
    }

    /// Check if any finding was recorded
    pub fn has_changes(&self) -> bool {
        self.total > 0
    }
}
