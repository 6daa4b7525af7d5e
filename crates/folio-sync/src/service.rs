//! Content service trait and error types.
//!
//! [`ContentService`] is the narrow interface the publisher uses to talk to
//! the remote page store. Implementations carry their own target space;
//! every call here operates on page ids within that space.

use crate::tree::Attachment;

/// A page as stored remotely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePage {
    /// Remote page id.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Page body in storage format.
    pub content: String,
    /// Current version number.
    pub version: u32,
}

/// New state of an existing page.
#[derive(Clone, Copy, Debug)]
pub struct PageUpdate<'a> {
    /// Remote id of the parent page.
    pub parent_id: &'a str,
    /// Page title.
    pub title: &'a str,
    /// Page body in storage format.
    pub content: &'a str,
}

/// Result of a delete request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The page existed and was removed.
    Deleted,
    /// The page was already gone.
    NotFound,
}

/// Semantic error categories reported by a content service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceErrorKind {
    /// Page does not exist.
    NotFound,
    /// Version mismatch or title already taken.
    Conflict,
    /// Credentials rejected.
    Unauthorized,
    /// Service temporarily unavailable (rate limit, 5xx, transport).
    Unavailable,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::Unavailable => "Unavailable",
            Self::Other => "Error",
        })
    }
}

/// Content service error with semantic kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    /// Semantic error category.
    pub kind: ServiceErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ServiceError {
    /// Create a new service error.
    #[must_use]
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Conflict, message)
    }

    /// True if the error reports a missing page.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ServiceErrorKind::NotFound
    }

    /// True if the error reports a version or title conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind == ServiceErrorKind::Conflict
    }
}

/// Remote page store.
///
/// Calls are blocking; the publisher issues them sequentially.
pub trait ContentService: Send + Sync {
    /// Find a page by exact title among the descendants of `ancestor_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the search request fails.
    fn find_page(&self, title: &str, ancestor_id: &str) -> Result<Option<String>, ServiceError>;

    /// Fetch a page with its body and version.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceErrorKind::NotFound`] error if the page is gone.
    fn get_page(&self, id: &str) -> Result<RemotePage, ServiceError>;

    /// Create a page under `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceErrorKind::Conflict`] error if the title is taken.
    fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<RemotePage, ServiceError>;

    /// Replace a page's parent, title and body; `version` is the current
    /// version. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceErrorKind::Conflict`] error if `version` is stale.
    fn update_page(
        &self,
        id: &str,
        update: &PageUpdate<'_>,
        version: u32,
    ) -> Result<u32, ServiceError>;

    /// Delete a page. A missing page is reported as [`DeleteOutcome::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for failures other than a missing page.
    fn delete_page(&self, id: &str) -> Result<DeleteOutcome, ServiceError>;

    /// Upload an attachment, replacing an existing one with the same file name.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the upload fails.
    fn upload_attachment(&self, page_id: &str, attachment: &Attachment)
    -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::not_found("page 42");
        assert_eq!(err.to_string(), "Not found: page 42");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_conflict_kind() {
        let err = ServiceError::conflict("version 3 is stale");
        assert_eq!(err.kind, ServiceErrorKind::Conflict);
        assert!(err.is_conflict());
    }
}
