//! Page operations for Confluence API.

use folio_sync::{DeleteOutcome, PageUpdate};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{ConfluenceClient, EditorVersion, check_status};
use crate::error::ConfluenceError;
use crate::types::{Page, PageSearchResponse};

impl ConfluenceClient {
    /// Find a page by exact title in the client's space that has
    /// `ancestor_id` somewhere in its ancestor chain.
    pub(crate) fn search_by_title(
        &self,
        title: &str,
        ancestor_id: &str,
    ) -> Result<Option<String>, ConfluenceError> {
        let url = search_url(&self.api_url(), &self.space_key, title);
        debug!("Searching for page '{}' under {}", title, ancestor_id);

        let response: PageSearchResponse = self.get_json(&url)?;
        Ok(find_under(response, ancestor_id))
    }

    /// Get page with body and version.
    pub(crate) fn fetch_page(&self, page_id: &str) -> Result<Page, ConfluenceError> {
        let url = format!(
            "{}/content/{}?expand=body.storage,version",
            self.api_url(),
            page_id
        );
        debug!("Getting page {}", page_id);
        self.get_json(&url)
    }

    /// Create a page under `parent_id`.
    pub(crate) fn create_content(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content", self.api_url());
        let payload = create_payload(&self.space_key, parent_id, title, content, self.editor);

        info!("Creating page '{}' under {}", title, parent_id);
        let page: Page = self.send_json("POST", &url, &payload)?;
        info!("Created page '{}' (id={})", title, page.id);
        Ok(page)
    }

    /// Update existing page; `version` is the version being replaced.
    pub(crate) fn update_content(
        &self,
        page_id: &str,
        update: &PageUpdate<'_>,
        version: u32,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);
        let payload = update_payload(&self.space_key, page_id, update, version);

        info!(
            "Updating page {} from version {} to {}",
            page_id,
            version,
            version + 1
        );
        self.send_json("PUT", &url, &payload)
    }

    /// Delete a page, treating a missing page as already deleted.
    pub(crate) fn delete_content(&self, page_id: &str) -> Result<DeleteOutcome, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);
        let auth_header = self.authorization("DELETE", &url)?;

        info!("Deleting page {}", page_id);
        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &auth_header)
            .header("Accept", "application/json")
            .call()?;

        match check_status(response) {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(ConfluenceError::HttpResponse { status: 404, .. }) => {
                debug!("Page {} already gone", page_id);
                Ok(DeleteOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn search_url(api_url: &str, space_key: &str, title: &str) -> String {
    format!(
        "{api_url}/content?type=page&spaceKey={}&title={}&expand=ancestors",
        encode(space_key),
        encode(title)
    )
}

/// First hit below `ancestor_id`.
fn find_under(response: PageSearchResponse, ancestor_id: &str) -> Option<String> {
    response
        .results
        .into_iter()
        .find(|page| page.ancestors.iter().any(|a| a.id == ancestor_id))
        .map(|page| page.id)
}

fn storage(content: &str) -> Value {
    json!({
        "storage": {
            "value": content,
            "representation": "storage"
        }
    })
}

fn create_payload(
    space_key: &str,
    parent_id: &str,
    title: &str,
    content: &str,
    editor: EditorVersion,
) -> Value {
    let mut payload = json!({
        "type": "page",
        "title": title,
        "space": {"key": space_key},
        "ancestors": [{"id": parent_id}],
        "body": storage(content)
    });
    if editor == EditorVersion::V2 {
        payload["metadata"] = json!({"properties": {"editor": {"value": "v2"}}});
    }
    payload
}

fn update_payload(space_key: &str, page_id: &str, update: &PageUpdate<'_>, version: u32) -> Value {
    json!({
        "id": page_id,
        "type": "page",
        "title": update.title,
        "space": {"key": space_key},
        "ancestors": [{"id": update.parent_id}],
        "body": storage(update.content),
        "version": {"number": version + 1}
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_search_url_encodes_title() {
        assert_eq!(
            search_url("https://wiki/rest/api", "DOC", "Q&A / Tips"),
            "https://wiki/rest/api/content?type=page&spaceKey=DOC&title=Q%26A%20%2F%20Tips&expand=ancestors"
        );
    }

    #[test]
    fn test_create_payload() {
        assert_eq!(
            create_payload("DOC", "100", "Guide", "<p>hi</p>", EditorVersion::V1),
            json!({
                "type": "page",
                "title": "Guide",
                "space": {"key": "DOC"},
                "ancestors": [{"id": "100"}],
                "body": {"storage": {"value": "<p>hi</p>", "representation": "storage"}}
            })
        );
    }

    #[test]
    fn test_create_payload_marks_new_editor() {
        let payload = create_payload("DOC", "100", "Guide", "<p>hi</p>", EditorVersion::V2);
        assert_eq!(
            payload["metadata"],
            json!({"properties": {"editor": {"value": "v2"}}})
        );
        assert_eq!(payload["title"], "Guide");
    }

    #[test]
    fn test_update_payload_bumps_version_and_moves() {
        let update = PageUpdate {
            parent_id: "200",
            title: "Renamed",
            content: "<p>new</p>",
        };
        let payload = update_payload("DOC", "42", &update, 3);
        assert_eq!(payload["version"]["number"], 4);
        assert_eq!(payload["ancestors"], json!([{"id": "200"}]));
        assert_eq!(payload["title"], "Renamed");
        assert_eq!(payload["id"], "42");
    }

    #[test]
    fn test_search_response_filters_by_ancestor() {
        let response: PageSearchResponse = serde_json::from_value(json!({
            "results": [
                {"id": "1", "title": "Guide", "ancestors": [{"id": "9"}]},
                {"id": "2", "title": "Guide", "ancestors": [{"id": "100"}, {"id": "150"}]}
            ],
            "size": 2
        }))
        .unwrap();
        assert_eq!(find_under(response.clone(), "100").as_deref(), Some("2"));
        assert_eq!(find_under(response, "7"), None);
    }
}
