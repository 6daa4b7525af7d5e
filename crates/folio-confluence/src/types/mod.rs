//! Confluence API types.

mod attachment;
mod page;

pub(crate) use attachment::{Attachment, AttachmentsResponse};
pub(crate) use page::{Page, PageSearchResponse};
