//! Confluence page types.

use serde::Deserialize;

/// Confluence page as returned with `body.storage` and `version` expanded.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Page {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Version information.
    pub version: Version,
    /// Page body content.
    #[serde(default)]
    pub body: Option<Body>,
}

/// Page version.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Version {
    /// Version number.
    pub number: u32,
}

/// Page body content.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Body {
    /// Storage format content.
    #[serde(default)]
    pub storage: Option<Storage>,
}

/// Storage format representation.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Storage {
    /// HTML content in Confluence storage format.
    pub value: String,
}

/// Reference to another content item.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PageRef {
    /// Content ID.
    pub id: String,
}

/// Search hit with its ancestor chain expanded.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PageSummary {
    /// Page ID.
    pub id: String,
    /// Ancestors from the space root down to the direct parent.
    #[serde(default)]
    pub ancestors: Vec<PageRef>,
}

/// Content search response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PageSearchResponse {
    /// Matching pages.
    pub results: Vec<PageSummary>,
}
