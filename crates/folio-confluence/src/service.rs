//! [`ContentService`] implementation for [`ConfluenceClient`].

use folio_sync::{
    Attachment, ContentService, DeleteOutcome, PageUpdate, RemotePage, ServiceError,
    ServiceErrorKind,
};

use crate::client::ConfluenceClient;
use crate::error::ConfluenceError;
use crate::types::Page;

impl ContentService for ConfluenceClient {
    fn find_page(&self, title: &str, ancestor_id: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.search_by_title(title, ancestor_id)?)
    }

    fn get_page(&self, id: &str) -> Result<RemotePage, ServiceError> {
        Ok(self.fetch_page(id)?.into())
    }

    fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<RemotePage, ServiceError> {
        Ok(self.create_content(parent_id, title, content)?.into())
    }

    fn update_page(
        &self,
        id: &str,
        update: &PageUpdate<'_>,
        version: u32,
    ) -> Result<u32, ServiceError> {
        Ok(self.update_content(id, update, version)?.version.number)
    }

    fn delete_page(&self, id: &str) -> Result<DeleteOutcome, ServiceError> {
        Ok(self.delete_content(id)?)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        attachment: &Attachment,
    ) -> Result<(), ServiceError> {
        Ok(self.put_attachment(
            page_id,
            &attachment.filename,
            &attachment.data,
            attachment.content_type,
        )?)
    }
}

impl From<Page> for RemotePage {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            title: page.title,
            content: page
                .body
                .and_then(|b| b.storage)
                .map(|s| s.value)
                .unwrap_or_default(),
            version: page.version.number,
        }
    }
}

impl From<ConfluenceError> for ServiceError {
    fn from(err: ConfluenceError) -> Self {
        let kind = match &err {
            ConfluenceError::HttpResponse { status, body } => status_kind(*status, body),
            ConfluenceError::HttpRequest(_) => ServiceErrorKind::Unavailable,
            _ => ServiceErrorKind::Other,
        };
        ServiceError::new(kind, err.to_string())
    }
}

/// Semantic kind of an HTTP error status.
///
/// Confluence reports a duplicate title on create as 400 with an
/// "already exists" message rather than 409.
fn status_kind(status: u16, body: &str) -> ServiceErrorKind {
    match status {
        404 => ServiceErrorKind::NotFound,
        409 => ServiceErrorKind::Conflict,
        400 if body.contains("already exists") => ServiceErrorKind::Conflict,
        401 | 403 => ServiceErrorKind::Unauthorized,
        429 | 500..=599 => ServiceErrorKind::Unavailable,
        _ => ServiceErrorKind::Other,
    }
}
