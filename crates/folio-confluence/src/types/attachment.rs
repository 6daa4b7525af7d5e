//! Confluence attachment types.

use serde::Deserialize;

/// Confluence attachment.
///
/// Serde ignores unknown fields from the API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Attachment {
    /// Attachment ID.
    pub id: String,
    /// Attachment title/filename.
    pub title: String,
}

/// Attachments API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AttachmentsResponse {
    /// List of attachments.
    pub results: Vec<Attachment>,
}
