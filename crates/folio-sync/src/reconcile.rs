//! Comparison of the prior inventory with a freshly built page tree.
//!
//! A prior entry whose path disappeared is either a rename (a new page with
//! the same content fingerprint took its place) or an orphan to delete.
//! Entries whose path still exists are left to the publisher.

use std::collections::{BTreeMap, HashSet};

use crate::inventory::{Inventory, PageInventoryEntry};
use crate::tree::PageTree;

/// Outcome of [`reconcile`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Prior entries with no counterpart in the new tree, in path order.
    pub to_delete: Vec<PageInventoryEntry>,
    /// Old path -> new path.
    pub renames: BTreeMap<String, String>,
}

impl ReconciliationResult {
    /// New path -> old path.
    #[must_use]
    pub fn rename_sources(&self) -> BTreeMap<&str, &str> {
        self.renames
            .iter()
            .map(|(old, new)| (new.as_str(), old.as_str()))
            .collect()
    }
}

/// Classify prior entries that are missing from `tree`.
///
/// Orphans are matched in path order against new nodes that are absent from
/// `prior`, share the entry's fingerprint, and are not yet claimed. Among
/// several candidates the one with the smallest path edit distance wins,
/// then the earliest in flat order.
pub fn reconcile(prior: &Inventory, tree: &PageTree) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();
    if prior.is_empty() {
        return result;
    }

    let mut claimed: HashSet<usize> = HashSet::new();
    for entry in prior.entries() {
        if tree.contains(&entry.path) {
            continue;
        }
        let target = tree
            .flat()
            .filter(|&idx| !claimed.contains(&idx))
            .filter(|&idx| {
                let node = tree.node(idx);
                !prior.contains(&node.path) && node.fingerprint == entry.content_fingerprint
            })
            .min_by_key(|&idx| (levenshtein(&entry.path, &tree.node(idx).path), idx));

        match target {
            Some(idx) => {
                claimed.insert(idx);
                result
                    .renames
                    .insert(entry.path.clone(), tree.node(idx).path.clone());
            }
            None => result.to_delete.push(entry.clone()),
        }
    }
    result
}

/// Character-level edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
