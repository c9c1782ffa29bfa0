//! Per-scan change report.
//!
//! Computes what one scan changed relative to everything folded before it:
//! posts seen for the first time, posts that vanished, and lost posts that
//! showed up again.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Changes introduced by one scan.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanDiff {
    /// Never seen before this scan
    pub added: BTreeSet<String>,
    /// Known, absent from this scan, not already in the lost ledger
    pub lost: BTreeSet<String>,
    /// In the lost ledger and present again
    pub returned: BTreeSet<String>,
}

impl ScanDiff {
    /// Compare a scan's post ids with the cumulative sets folded so far.
    pub fn calculate(
        known: &BTreeSet<String>,
        already_lost: &BTreeSet<String>,
        current: &BTreeSet<String>,
    ) -> Self {
        let added = current.difference(known).cloned().collect();

        let lost = known
            .iter()
            .filter(|id| !current.contains(*id) && !already_lost.contains(*id))
            .cloned()
            .collect();

        let returned = already_lost.intersection(current).cloned().collect();

        Self {
            added,
            lost,
            returned,
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.lost.is_empty() || !self.returned.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.lost.len() + self.returned.len()
    }
}
