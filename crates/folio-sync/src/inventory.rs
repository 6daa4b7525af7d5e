//! Durable record of previously published pages.
//!
//! The inventory is the only state kept between runs. It serializes to a
//! single JSON object keyed by page path:
//!
//! ```json
//! {
//!   "guide/index.html": {
//!     "path": "guide/index.html",
//!     "remoteId": "98311",
//!     "contentFingerprint": "9f86d081884c7d65...",
//!     "title": "Guide",
//!     "parentId": "98304"
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::tree::PageNode;

/// One previously published page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInventoryEntry {
    /// Page path at the time of the last publish.
    #[serde(default)]
    pub path: String,
    /// Remote page id.
    pub remote_id: String,
    /// Fingerprint of the last published content.
    #[serde(default)]
    pub content_fingerprint: String,
    /// Title at the time of the last publish.
    #[serde(default)]
    pub title: String,
    /// Remote id of the parent page at the time of the last publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl PageInventoryEntry {
    /// Entry for `node` published as `remote_id` under `parent_id`.
    #[must_use]
    pub fn published(node: &PageNode, remote_id: String, parent_id: &str) -> Self {
        Self {
            path: node.path.clone(),
            remote_id,
            content_fingerprint: node.fingerprint.clone(),
            title: node.title.clone(),
            parent_id: Some(parent_id.to_owned()),
        }
    }

    /// True if the remote page already matches `node` placed under `parent_id`.
    #[must_use]
    pub fn is_current(&self, node: &PageNode, parent_id: Option<&str>) -> bool {
        self.content_fingerprint == node.fingerprint
            && self.title == node.title
            && parent_id.is_some()
            && self.parent_id.as_deref() == parent_id
    }

    /// Number of path segments (used to delete deeper pages first).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.split('/').count()
    }
}

/// Mapping from page path to [`PageInventoryEntry`], ordered by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    entries: BTreeMap<String, PageInventoryEntry>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an inventory from its JSON form.
    ///
    /// The map key is authoritative: an entry's `path` is reset to its key.
    pub fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        let mut inventory: Self = serde_json::from_str(value)?;
        for (path, entry) in &mut inventory.entries {
            entry.path.clone_from(path);
        }
        Ok(inventory)
    }

    /// Encode the inventory as a JSON object with sorted keys.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the inventory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PageInventoryEntry> {
        self.entries.get(path)
    }

    /// True if an entry exists for the path.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert an entry keyed by its path, replacing any previous entry.
    pub fn insert(&mut self, entry: PageInventoryEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Remove the entry for a path.
    pub fn remove(&mut self, path: &str) -> Option<PageInventoryEntry> {
        self.entries.remove(path)
    }

    /// Entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &PageInventoryEntry> {
        self.entries.values()
    }

    /// Published title of every entry, keyed by path.
    #[must_use]
    pub fn titles(&self) -> HashMap<String, String> {
        self.entries()
            .map(|e| (e.path.clone(), e.title.clone()))
            .collect()
    }
}

impl FromIterator<PageInventoryEntry> for Inventory {
    fn from_iter<I: IntoIterator<Item = PageInventoryEntry>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for entry in iter {
            inventory.insert(entry);
        }
        inventory
    }
}
