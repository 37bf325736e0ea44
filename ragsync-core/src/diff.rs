//! Change classification between the tracked state and the current corpus

use crate::tracker::FileEntry;
use std::collections::{BTreeMap, BTreeSet};

/// Four disjoint sets of canonical paths.
///
/// added ∪ modified ∪ unchanged covers the current corpus;
/// removed ∪ modified ∪ unchanged covers the previous tracker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl DiffReport {
    /// True when no index work is needed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Paths whose recorded nodes must be deleted (removed ∪ modified)
    pub fn stale(&self) -> BTreeSet<String> {
        self.removed.union(&self.modified).cloned().collect()
    }

    /// Paths whose content must be split and inserted (added ∪ modified)
    pub fn fresh(&self) -> BTreeSet<String> {
        self.added.union(&self.modified).cloned().collect()
    }
}

/// Classify every path by comparing recorded hashes against the current
/// run's content fingerprints. Purely set arithmetic; the
/// source-identity bypass is the orchestrator's call.
pub fn diff_files(
    previous: &BTreeMap<String, FileEntry>,
    current: &BTreeMap<String, String>,
) -> DiffReport {
    let mut report = DiffReport::default();

    for (path, hash) in current {
        match previous.get(path) {
            None => {
                report.added.insert(path.clone());
            }
            Some(entry) if &entry.hash == hash => {
                report.unchanged.insert(path.clone());
            }
            Some(_) => {
                report.modified.insert(path.clone());
            }
        }
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            report.removed.insert(path.clone());
        }
    }

    report
}
