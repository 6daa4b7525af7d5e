//! In-memory content service for testing.
//!
//! Provides [`MockService`], which keeps a page tree in memory, enforces
//! space-unique titles and version checks, and records every call so tests
//! can assert on ordering.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use crate::service::{
    ContentService, DeleteOutcome, PageUpdate, RemotePage, ServiceError, ServiceErrorKind,
};
use crate::tree::Attachment;

/// A page held by [`MockService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockPage {
    /// Page id.
    pub id: String,
    /// Parent page id (`None` for space roots).
    pub parent_id: Option<String>,
    /// Page title.
    pub title: String,
    /// Page body.
    pub content: String,
    /// Current version.
    pub version: u32,
    /// Attachment file name -> bytes.
    pub attachments: BTreeMap<String, Vec<u8>>,
}

/// A recorded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceCall {
    /// `find_page(title, ancestor_id)`
    Find { title: String, ancestor_id: String },
    /// `get_page(id)`
    Get { id: String },
    /// `create_page(parent_id, title, ..)`
    Create { parent_id: String, title: String },
    /// `update_page(id, ..)`
    Update {
        id: String,
        parent_id: String,
        title: String,
    },
    /// `delete_page(id)`
    Delete { id: String },
    /// `upload_attachment(page_id, ..)`
    Upload { page_id: String, filename: String },
}

/// Mock content service for testing.
///
/// # Example
///
/// ```ignore
/// use folio_sync::{ContentService, MockService};
///
/// let service = MockService::new().with_page("100", None, "Docs", "");
/// let page = service.create_page("100", "Guide", "<p>Hi</p>")?;
/// assert_eq!(service.page(&page.id).unwrap().parent_id.as_deref(), Some("100"));
/// ```
#[derive(Debug)]
pub struct MockService {
    pages: RwLock<BTreeMap<String, MockPage>>,
    calls: RwLock<Vec<ServiceCall>>,
    next_id: RwLock<u64>,
    failing_creates: RwLock<HashSet<String>>,
    failing_updates: RwLock<HashSet<String>>,
    failing_deletes: RwLock<HashSet<String>>,
}

impl Default for MockService {
    fn default() -> Self {
        Self {
            pages: RwLock::new(BTreeMap::new()),
            calls: RwLock::new(Vec::new()),
            next_id: RwLock::new(1000),
            failing_creates: RwLock::new(HashSet::new()),
            failing_updates: RwLock::new(HashSet::new()),
            failing_deletes: RwLock::new(HashSet::new()),
        }
    }
}

impl MockService {
    /// Create an empty mock service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an existing page at version 1.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(
        self,
        id: impl Into<String>,
        parent_id: Option<&str>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let id = id.into();
        self.pages.write().unwrap().insert(
            id.clone(),
            MockPage {
                id,
                parent_id: parent_id.map(str::to_owned),
                title: title.into(),
                content: content.into(),
                version: 1,
                attachments: BTreeMap::new(),
            },
        );
        self
    }

    /// Make `create_page` fail for the given title.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn failing_create(self, title: impl Into<String>) -> Self {
        self.failing_creates.write().unwrap().insert(title.into());
        self
    }

    /// Make `update_page` fail for the given page id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn failing_update(self, id: impl Into<String>) -> Self {
        self.failing_updates.write().unwrap().insert(id.into());
        self
    }

    /// Make `delete_page` fail for the given page id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn failing_delete(self, id: impl Into<String>) -> Self {
        self.failing_deletes.write().unwrap().insert(id.into());
        self
    }

    /// Calls recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Forget recorded calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Page by id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page(&self, id: &str) -> Option<MockPage> {
        self.pages.read().unwrap().get(id).cloned()
    }

    /// Page by exact title.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page_by_title(&self, title: &str) -> Option<MockPage> {
        self.pages
            .read()
            .unwrap()
            .values()
            .find(|p| p.title == title)
            .cloned()
    }

    /// All pages ordered by id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn pages(&self) -> Vec<MockPage> {
        self.pages.read().unwrap().values().cloned().collect()
    }

    /// Simulate a concurrent edit by bumping a page's version.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn bump_version(&self, id: &str) {
        if let Some(page) = self.pages.write().unwrap().get_mut(id) {
            page.version += 1;
        }
    }

    /// Simulate an out-of-band deletion (no call is recorded).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_page(&self, id: &str) {
        self.pages.write().unwrap().remove(id);
    }

    fn record(&self, call: ServiceCall) {
        self.calls.write().unwrap().push(call);
    }

    fn is_descendant(pages: &BTreeMap<String, MockPage>, id: &str, ancestor_id: &str) -> bool {
        let mut current = pages.get(id).and_then(|p| p.parent_id.as_deref());
        while let Some(parent) = current {
            if parent == ancestor_id {
                return true;
            }
            current = pages.get(parent).and_then(|p| p.parent_id.as_deref());
        }
        false
    }
}

impl ContentService for MockService {
    fn find_page(&self, title: &str, ancestor_id: &str) -> Result<Option<String>, ServiceError> {
        self.record(ServiceCall::Find {
            title: title.to_owned(),
            ancestor_id: ancestor_id.to_owned(),
        });
        let pages = self.pages.read().unwrap();
        Ok(pages
            .values()
            .find(|p| p.title == title && Self::is_descendant(&pages, &p.id, ancestor_id))
            .map(|p| p.id.clone()))
    }

    fn get_page(&self, id: &str) -> Result<RemotePage, ServiceError> {
        self.record(ServiceCall::Get { id: id.to_owned() });
        self.pages
            .read()
            .unwrap()
            .get(id)
            .map(|p| RemotePage {
                id: p.id.clone(),
                title: p.title.clone(),
                content: p.content.clone(),
                version: p.version,
            })
            .ok_or_else(|| ServiceError::not_found(format!("page {id}")))
    }

    fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<RemotePage, ServiceError> {
        self.record(ServiceCall::Create {
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
        });
        if self.failing_creates.read().unwrap().contains(title) {
            return Err(ServiceError::new(
                ServiceErrorKind::Unavailable,
                format!("create of '{title}' rejected"),
            ));
        }
        let mut pages = self.pages.write().unwrap();
        if !pages.contains_key(parent_id) {
            return Err(ServiceError::not_found(format!("parent page {parent_id}")));
        }
        if pages.values().any(|p| p.title == title) {
            return Err(ServiceError::conflict(format!(
                "a page with title '{title}' already exists"
            )));
        }
        let id = {
            let mut next_id = self.next_id.write().unwrap();
            *next_id += 1;
            next_id.to_string()
        };
        let page = MockPage {
            id: id.clone(),
            parent_id: Some(parent_id.to_owned()),
            title: title.to_owned(),
            content: content.to_owned(),
            version: 1,
            attachments: BTreeMap::new(),
        };
        pages.insert(id.clone(), page);
        Ok(RemotePage {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            version: 1,
        })
    }

    fn update_page(
        &self,
        id: &str,
        update: &PageUpdate<'_>,
        version: u32,
    ) -> Result<u32, ServiceError> {
        self.record(ServiceCall::Update {
            id: id.to_owned(),
            parent_id: update.parent_id.to_owned(),
            title: update.title.to_owned(),
        });
        if self.failing_updates.read().unwrap().contains(id) {
            return Err(ServiceError::new(
                ServiceErrorKind::Unavailable,
                format!("update of page {id} rejected"),
            ));
        }
        let mut pages = self.pages.write().unwrap();
        if pages
            .values()
            .any(|p| p.id != id && p.title == update.title)
        {
            return Err(ServiceError::conflict(format!(
                "a page with title '{}' already exists",
                update.title
            )));
        }
        let page = pages
            .get_mut(id)
            .ok_or_else(|| ServiceError::not_found(format!("page {id}")))?;
        if page.version != version {
            return Err(ServiceError::conflict(format!(
                "page {id} is at version {}, not {version}",
                page.version
            )));
        }
        page.parent_id = Some(update.parent_id.to_owned());
        page.title = update.title.to_owned();
        page.content = update.content.to_owned();
        page.version += 1;
        Ok(page.version)
    }

    fn delete_page(&self, id: &str) -> Result<DeleteOutcome, ServiceError> {
        self.record(ServiceCall::Delete { id: id.to_owned() });
        if self.failing_deletes.read().unwrap().contains(id) {
            return Err(ServiceError::new(
                ServiceErrorKind::Unavailable,
                format!("delete of page {id} rejected"),
            ));
        }
        let mut pages = self.pages.write().unwrap();
        let Some(removed) = pages.remove(id) else {
            return Ok(DeleteOutcome::NotFound);
        };
        // Children move up to the deleted page's parent
        for page in pages.values_mut() {
            if page.parent_id.as_deref() == Some(id) {
                page.parent_id.clone_from(&removed.parent_id);
            }
        }
        Ok(DeleteOutcome::Deleted)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        attachment: &Attachment,
    ) -> Result<(), ServiceError> {
        self.record(ServiceCall::Upload {
            page_id: page_id.to_owned(),
            filename: attachment.filename.clone(),
        });
        let mut pages = self.pages.write().unwrap();
        let page = pages
            .get_mut(page_id)
            .ok_or_else(|| ServiceError::not_found(format!("page {page_id}")))?;
        page.attachments
            .insert(attachment.filename.clone(), attachment.data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    fn update<'a>(parent_id: &'a str, title: &'a str, content: &'a str) -> PageUpdate<'a> {
        PageUpdate {
            parent_id,
            title,
            content,
        }
    }

    #[test]
    fn test_mock_service_is_send_sync() {
        assert_send_sync::<MockService>();
    }

    #[test]
    fn test_create_and_get() {
        let service = MockService::new().with_page("100", None, "Docs", "");

        let created = service.create_page("100", "Guide", "<p>Hi</p>").unwrap();
        let fetched = service.get_page(&created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(
            service.page(&created.id).unwrap().parent_id.as_deref(),
            Some("100")
        );
    }

    #[test]
    fn test_create_requires_parent() {
        let service = MockService::new();
        let err = service.create_page("404", "Guide", "").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_rejects_duplicate_title() {
        let service = MockService::new()
            .with_page("100", None, "Docs", "")
            .with_page("101", Some("100"), "Guide", "");
        let err = service.create_page("100", "Guide", "").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_checks_version() {
        let service = MockService::new()
            .with_page("100", None, "Docs", "")
            .with_page("101", Some("100"), "Guide", "old");

        let version = service
            .update_page("101", &update("100", "Guide", "new"), 1)
            .unwrap();
        assert_eq!(version, 2);
        assert_eq!(service.page("101").unwrap().content, "new");

        let err = service
            .update_page("101", &update("100", "Guide", "newer"), 1)
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_missing_page() {
        let service = MockService::new();
        let err = service
            .update_page("7", &update("1", "Gone", ""), 1)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_moves_children_up() {
        let service = MockService::new()
            .with_page("100", None, "Docs", "")
            .with_page("101", Some("100"), "Guide", "")
            .with_page("102", Some("101"), "Setup", "");

        assert_eq!(service.delete_page("101").unwrap(), DeleteOutcome::Deleted);
        assert_eq!(service.page("102").unwrap().parent_id.as_deref(), Some("100"));
        assert_eq!(service.delete_page("101").unwrap(), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_find_page_scoped_to_ancestor() {
        let service = MockService::new()
            .with_page("100", None, "Docs", "")
            .with_page("101", Some("100"), "Guide", "")
            .with_page("200", None, "Other", "")
            .with_page("201", Some("200"), "Notes", "");

        assert_eq!(
            service.find_page("Guide", "100").unwrap().as_deref(),
            Some("101")
        );
        assert_eq!(service.find_page("Notes", "100").unwrap(), None);
    }

    #[test]
    fn test_failure_injection() {
        let service = MockService::new()
            .with_page("100", None, "Docs", "")
            .with_page("101", Some("100"), "Guide", "")
            .failing_create("Broken")
            .failing_update("101")
            .failing_delete("101");

        assert!(service.create_page("100", "Broken", "").is_err());
        assert!(
            service
                .update_page("101", &update("100", "Guide", ""), 1)
                .is_err()
        );
        assert!(service.delete_page("101").is_err());
        assert!(service.page("101").is_some());
    }

    #[test]
    fn test_calls_are_recorded() {
        let service = MockService::new().with_page("100", None, "Docs", "");
        let page = service.create_page("100", "Guide", "").unwrap();
        let attachment = Attachment {
            filename: "logo.png".to_owned(),
            data: b"png".to_vec(),
            content_type: "image/png",
        };
        service.upload_attachment(&page.id, &attachment).unwrap();

        assert_eq!(
            service.calls(),
            vec![
                ServiceCall::Create {
                    parent_id: "100".to_owned(),
                    title: "Guide".to_owned(),
                },
                ServiceCall::Upload {
                    page_id: page.id.clone(),
                    filename: "logo.png".to_owned(),
                },
            ]
        );
        assert_eq!(
            service.page(&page.id).unwrap().attachments["logo.png"],
            b"png".to_vec()
        );

        service.clear_calls();
        assert!(service.calls().is_empty());
    }
}
