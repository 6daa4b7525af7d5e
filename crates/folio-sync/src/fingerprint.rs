//! Content fingerprints used to detect unchanged and renamed pages.

use sha2::{Digest, Sha256};

use crate::tree::Attachment;

/// Compute the fingerprint of a page body and its attachments.
///
/// # Hash Format
///
/// SHA-256 over the content bytes followed, for every attachment in the
/// given order, by `\0{filename}\0{len as u64 le}{data}`. Returns 64 hex characters.
#[must_use]
pub fn fingerprint(content: &str, attachments: &[Attachment]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    for attachment in attachments {
        hasher.update([0u8]);
        hasher.update(attachment.filename.as_bytes());
        hasher.update([0u8]);
        hasher.update((attachment.data.len() as u64).to_le_bytes());
        hasher.update(&attachment.data);
    }
    hex::encode(hasher.finalize())
}
