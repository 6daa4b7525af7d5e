//! Persistence of the publish inventory in a dedicated remote page.
//!
//! The state page lives directly under the configured ancestor. Its body is
//! a code macro holding the JSON value in a CDATA section, so the value
//! survives the service's storage-format normalization and stays readable
//! in the wiki:
//!
//! ```text
//! <ac:structured-macro ac:name="code">
//!   <ac:parameter ac:name="language">json</ac:parameter>
//!   <ac:plain-text-body><![CDATA[{"index.html":{...}}]]></ac:plain-text-body>
//! </ac:structured-macro>
//! ```
//!
//! Writes are guarded by the page version read at the start of the run.

use tracing::info;

use crate::service::{ContentService, PageUpdate, ServiceError};

const BODY_OPEN: &str = concat!(
    r#"<ac:structured-macro ac:name="code">"#,
    r#"<ac:parameter ac:name="language">json</ac:parameter>"#,
    "<ac:plain-text-body><![CDATA[",
);
const BODY_CLOSE: &str = "]]></ac:plain-text-body></ac:structured-macro>";

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Error returned by [`StateStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A state page already exists where a new one was to be created.
    #[error("State page '{title}' already exists")]
    Conflict {
        /// State page title.
        title: String,
    },
    /// The state page changed since it was read.
    #[error("State page {page_id} changed since version {expected} was read")]
    Stale {
        /// State page id.
        page_id: String,
        /// Version the run started from.
        expected: u32,
    },
    /// The state page body does not contain a stored value.
    #[error("State page {page_id} has no readable value")]
    Corrupt {
        /// State page id.
        page_id: String,
    },
    /// Content service call failed.
    #[error("Content service error: {0}")]
    Service(#[from] ServiceError),
}

/// The state page as read at the start of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateHandle {
    /// State page id.
    pub page_id: String,
    /// Version the value was read at.
    pub version: u32,
    /// Stored JSON value.
    pub value: String,
}

/// Reads and writes the state page.
#[derive(Clone, Debug)]
pub struct StateStore {
    title: String,
    ancestor_id: String,
}

impl StateStore {
    /// Create a store for the page `title` under `ancestor_id`.
    #[must_use]
    pub fn new(title: impl Into<String>, ancestor_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ancestor_id: ancestor_id.into(),
        }
    }

    /// Load the state page, or `None` on the first run.
    pub fn initialize<C: ContentService + ?Sized>(
        &self,
        client: &C,
    ) -> Result<Option<StateHandle>, StateError> {
        let Some(page_id) = client.find_page(&self.title, &self.ancestor_id)? else {
            return Ok(None);
        };
        let page = match client.get_page(&page_id) {
            Ok(page) => page,
            // Removed between search and fetch
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = decode_body(&page.content).ok_or_else(|| StateError::Corrupt {
            page_id: page.id.clone(),
        })?;
        Ok(Some(StateHandle {
            page_id: page.id,
            version: page.version,
            value,
        }))
    }

    /// Create the state page holding `value`.
    pub fn create<C: ContentService + ?Sized>(
        &self,
        client: &C,
        value: &str,
    ) -> Result<StateHandle, StateError> {
        if client.find_page(&self.title, &self.ancestor_id)?.is_some() {
            return Err(self.conflict());
        }
        let page = client
            .create_page(&self.ancestor_id, &self.title, &encode_body(value))
            .map_err(|e| if e.is_conflict() { self.conflict() } else { e.into() })?;
        info!(page_id = %page.id, title = %self.title, "Created state page");
        Ok(StateHandle {
            page_id: page.id,
            version: page.version,
            value: value.to_owned(),
        })
    }

    /// Overwrite the state page with `value`, guarded by `handle.version`.
    pub fn update<C: ContentService + ?Sized>(
        &self,
        client: &C,
        handle: &StateHandle,
        value: &str,
    ) -> Result<StateHandle, StateError> {
        let stale = || StateError::Stale {
            page_id: handle.page_id.clone(),
            expected: handle.version,
        };
        let current = client.get_page(&handle.page_id)?;
        if current.version != handle.version {
            return Err(stale());
        }
        let body = encode_body(value);
        let update = PageUpdate {
            parent_id: &self.ancestor_id,
            title: &self.title,
            content: &body,
        };
        let version = client
            .update_page(&handle.page_id, &update, handle.version)
            .map_err(|e| if e.is_conflict() { stale() } else { e.into() })?;
        info!(page_id = %handle.page_id, version, "Updated state page");
        Ok(StateHandle {
            page_id: handle.page_id.clone(),
            version,
            value: value.to_owned(),
        })
    }

    fn conflict(&self) -> StateError {
        StateError::Conflict {
            title: self.title.clone(),
        }
    }
}

/// Wrap a value in the state page body.
fn encode_body(value: &str) -> String {
    // A literal "]]>" would end the section; split it across two sections
    let escaped = value.replace(CDATA_CLOSE, "]]]]><![CDATA[>");
    format!("{BODY_OPEN}{escaped}{BODY_CLOSE}")
}

/// Extract the value from a state page body.
///
/// Concatenates every CDATA section. A body without any section is accepted
/// as the value itself if it looks like a JSON object.
fn decode_body(body: &str) -> Option<String> {
    let mut value = String::new();
    let mut found = false;
    let mut rest = body;
    while let Some(start) = rest.find(CDATA_OPEN) {
        let after = &rest[start + CDATA_OPEN.len()..];
        let end = after.find(CDATA_CLOSE)?;
        value.push_str(&after[..end]);
        rest = &after[end + CDATA_CLOSE.len()..];
        found = true;
    }
    if found {
        return Some(value);
    }
    let trimmed = body.trim();
    trimmed.starts_with('{').then(|| trimmed.to_owned())
}
