//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::info;

use super::{ConfluenceClient, check_status};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

impl ConfluenceClient {
    /// Upload or replace an attachment (upsert by filename).
    pub(crate) fn put_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), ConfluenceError> {
        let url = match self.find_attachment_by_name(page_id, filename)? {
            Some(existing) => {
                info!(
                    "Updating attachment '{}' (id={}) on page {}",
                    filename, existing.id, page_id
                );
                format!(
                    "{}/content/{}/child/attachment/{}/data",
                    self.api_url(),
                    page_id,
                    existing.id
                )
            }
            None => {
                info!("Uploading attachment '{}' to page {}", filename, page_id);
                format!("{}/content/{}/child/attachment", self.api_url(), page_id)
            }
        };

        let auth_header = self.authorization("POST", &url)?;
        let boundary = format!("----FolioFormBoundary{:016x}", rand::rng().random::<u64>());
        let body = multipart_body(&boundary, filename, data, content_type);

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        check_status(response)?;
        Ok(())
    }

    /// Find attachment by filename on a page.
    fn find_attachment_by_name(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        let url = format!(
            "{}/content/{}/child/attachment?limit=1000",
            self.api_url(),
            page_id
        );
        let attachments: AttachmentsResponse = self.get_json(&url)?;
        Ok(attachments
            .results
            .into_iter()
            .find(|a| a.title == filename))
    }
}

/// Single-file multipart form body.
fn multipart_body(boundary: &str, filename: &str, data: &[u8], content_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_multipart_body() {
        let body = multipart_body("XYZ", "logo.png", b"\x89PNG", "image/png");
        let expected = [
            &b"--XYZ\r\n"[..],
            b"Content-Disposition: form-data; name=\"file\"; filename=\"logo.png\"\r\n",
            b"Content-Type: image/png\r\n\r\n",
            b"\x89PNG\r\n",
            b"--XYZ--\r\n",
        ]
        .concat();
        assert_eq!(body, expected);
    }
}
