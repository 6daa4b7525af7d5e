//! Publish orchestration.
//!
//! A run builds the page tree, loads the prior inventory from the state page,
//! reconciles the two, deletes orphaned pages, creates or updates the
//! remaining pages parents first, and finally writes the new inventory back.
//!
//! Per-page failures do not abort the run: a page that fails is reported,
//! its subtree is skipped, and its prior inventory entry is carried forward
//! so the next run can retry without losing the remote identity.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::artifact::{FileArtifact, collect_artifacts};
use crate::inventory::{Inventory, PageInventoryEntry};
use crate::reconcile::{ReconciliationResult, reconcile};
use crate::report::{PageAction, PlannedAction, PublishPlan, PublishReport};
use crate::service::{ContentService, DeleteOutcome, PageUpdate, ServiceError};
use crate::state::{StateError, StateHandle, StateStore};
use crate::tree::{PageNode, PageTree, PageTreeBuilder, TreeConfig, TreeError};

/// Default title of the state page.
pub const DEFAULT_STATE_TITLE: &str = "Folio Publish State";

/// Configuration for [`Publisher`].
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    /// Page tree builder settings.
    pub tree: TreeConfig,
    /// Remote page under which the tree and the state page live.
    pub ancestor_id: String,
    /// Title of the state page.
    pub state_title: String,
    /// Return immediately without touching anything.
    pub skip: bool,
}

impl PublisherConfig {
    /// Default configuration publishing under `ancestor_id`.
    #[must_use]
    pub fn new(ancestor_id: impl Into<String>) -> Self {
        Self {
            tree: TreeConfig::default(),
            ancestor_id: ancestor_id.into(),
            state_title: DEFAULT_STATE_TITLE.to_owned(),
            skip: false,
        }
    }
}

/// Error returned by [`Publisher`].
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Output directory does not exist.
    #[error("Output directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// Output directory could not be read.
    #[error("Failed to read output directory: {0}")]
    Io(#[from] io::Error),
    /// Artifacts could not be arranged into a page tree.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// State page could not be read.
    #[error(transparent)]
    State(#[from] StateError),
    /// State page value is not a valid inventory.
    #[error("Invalid publish state: {0}")]
    Inventory(#[source] serde_json::Error),
    /// Remote pages changed but the new inventory could not be stored.
    #[error("Failed to write publish state after remote changes: {source}")]
    StateWrite {
        /// Underlying state error.
        #[source]
        source: StateError,
        /// What the run did before the write failed.
        report: Box<PublishReport>,
    },
}

/// Publishes a page tree to a [`ContentService`].
pub struct Publisher<'a, C: ContentService + ?Sized> {
    client: &'a C,
    config: PublisherConfig,
}

impl<'a, C: ContentService + ?Sized> Publisher<'a, C> {
    /// Create a publisher.
    pub fn new(client: &'a C, config: PublisherConfig) -> Self {
        Self { client, config }
    }

    /// Publish every artifact under `output_dir`.
    ///
    /// # Errors
    ///
    /// See [`PublishError`]. Per-page failures are reported in the returned
    /// [`PublishReport`] instead.
    pub fn run(&self, output_dir: &Path) -> Result<PublishReport, PublishError> {
        if self.config.skip {
            info!("Publishing skipped by configuration");
            return Ok(PublishReport::skipped());
        }
        if !output_dir.is_dir() {
            return Err(PublishError::DirectoryNotFound(output_dir.to_path_buf()));
        }
        let files = collect_artifacts(output_dir)?;
        info!(files = files.len(), dir = %output_dir.display(), "Collected artifacts");
        self.execute(&files)
    }

    /// Publish the given artifacts.
    pub fn publish(&self, files: &[FileArtifact]) -> Result<PublishReport, PublishError> {
        if self.config.skip {
            info!("Publishing skipped by configuration");
            return Ok(PublishReport::skipped());
        }
        self.execute(files)
    }

    /// Compute what [`publish`](Self::publish) would do without changing
    /// anything remotely.
    pub fn plan(&self, files: &[FileArtifact]) -> Result<PublishPlan, PublishError> {
        if self.config.skip {
            info!("Publishing skipped by configuration");
            return Ok(PublishPlan::skipped());
        }
        let tree = self.build_tree(files, None)?;
        let Some(handle) = self.state_store().initialize(self.client)? else {
            return Ok(PublishPlan {
                bootstrap: true,
                pages: tree
                    .nodes()
                    .map(|node| (node.path.clone(), PlannedAction::Create))
                    .collect(),
                ..PublishPlan::default()
            });
        };
        let prior = decode_inventory(&handle)?;
        let tree = self.build_tree(files, Some(&prior))?;
        let reconciliation = reconcile(&prior, &tree);
        let sources = reconciliation.rename_sources();

        // Remote ids as they would be after publishing, `None` for new pages
        let mut remote_ids: Vec<Option<&str>> = Vec::with_capacity(tree.len());
        let mut pages = Vec::with_capacity(tree.len());
        for idx in tree.flat() {
            let node = tree.node(idx);
            let renamed_from = sources.get(node.path.as_str()).copied();
            let entry = prior_entry(&prior, &node.path, renamed_from);
            let parent_id = match tree.parent(idx) {
                Some(p) => remote_ids[p],
                None => Some(self.config.ancestor_id.as_str()),
            };
            let action = match (entry, renamed_from) {
                (None, _) => PlannedAction::Create,
                (Some(_), Some(from)) => PlannedAction::Rename {
                    from: from.to_owned(),
                },
                (Some(entry), None) if entry.is_current(node, parent_id) => {
                    PlannedAction::Unchanged
                }
                (Some(_), None) => PlannedAction::Update,
            };
            remote_ids.push(entry.map(|e| e.remote_id.as_str()));
            pages.push((node.path.clone(), action));
        }

        Ok(PublishPlan {
            skipped: false,
            bootstrap: false,
            pages,
            delete: reconciliation
                .to_delete
                .iter()
                .map(|e| e.path.clone())
                .collect(),
        })
    }

    fn execute(&self, files: &[FileArtifact]) -> Result<PublishReport, PublishError> {
        // Built before any remote call so malformed paths abort early
        let mut tree = self.build_tree(files, None)?;
        let store = self.state_store();
        match store.initialize(self.client)? {
            None => self.bootstrap(&store, &mut tree),
            Some(handle) => {
                let prior = decode_inventory(&handle)?;
                let mut tree = self.build_tree(files, Some(&prior))?;
                self.synchronize(&store, &handle, &prior, &mut tree)
            }
        }
    }

    /// First run: create every page, then the state page.
    fn bootstrap(
        &self,
        store: &StateStore,
        tree: &mut PageTree,
    ) -> Result<PublishReport, PublishError> {
        info!(pages = tree.len(), "No publish state found, publishing all pages");
        let mut report = PublishReport::default();
        let mut inventory = Inventory::new();
        self.publish_tree(
            tree,
            &Inventory::new(),
            &ReconciliationResult::default(),
            &mut inventory,
            &mut report,
        );

        let value = inventory.to_json().map_err(PublishError::Inventory)?;
        match store.create(self.client, &value) {
            Ok(_) => Ok(report),
            Err(source) => Err(state_write_failed(source, report)),
        }
    }

    /// Later runs: reconcile against the stored inventory.
    fn synchronize(
        &self,
        store: &StateStore,
        handle: &StateHandle,
        prior: &Inventory,
        tree: &mut PageTree,
    ) -> Result<PublishReport, PublishError> {
        let reconciliation = reconcile(prior, tree);
        info!(
            prior = prior.len(),
            pages = tree.len(),
            renames = reconciliation.renames.len(),
            orphans = reconciliation.to_delete.len(),
            "Reconciled publish state"
        );

        let mut report = PublishReport::default();
        let mut inventory = Inventory::new();
        self.delete_orphans(&reconciliation.to_delete, &mut inventory, &mut report);
        self.publish_tree(tree, prior, &reconciliation, &mut inventory, &mut report);

        let value = inventory.to_json().map_err(PublishError::Inventory)?;
        match store.update(self.client, handle, &value) {
            Ok(_) => Ok(report),
            Err(source) => Err(state_write_failed(source, report)),
        }
    }

    /// Delete orphaned pages, deepest first. Failed deletions stay in the inventory.
    fn delete_orphans(
        &self,
        orphans: &[PageInventoryEntry],
        inventory: &mut Inventory,
        report: &mut PublishReport,
    ) {
        let mut ordered: Vec<&PageInventoryEntry> = orphans.iter().collect();
        ordered.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.path.cmp(&b.path)));

        for entry in ordered {
            match self.client.delete_page(&entry.remote_id) {
                Ok(DeleteOutcome::Deleted) => {
                    info!(path = %entry.path, page_id = %entry.remote_id, "Deleted page");
                    report.deleted.push(entry.path.clone());
                }
                Ok(DeleteOutcome::NotFound) => {
                    debug!(path = %entry.path, page_id = %entry.remote_id, "Page already deleted");
                    report.deleted.push(entry.path.clone());
                }
                Err(e) => {
                    warn!(path = %entry.path, page_id = %entry.remote_id, error = %e, "Failed to delete page");
                    report.fail(&entry.path, &e);
                    inventory.insert(entry.clone());
                }
            }
        }
    }

    /// Create or update every node in flat order.
    fn publish_tree(
        &self,
        tree: &mut PageTree,
        prior: &Inventory,
        reconciliation: &ReconciliationResult,
        inventory: &mut Inventory,
        report: &mut PublishReport,
    ) {
        let sources = reconciliation.rename_sources();
        // Remote ids that belong to some path and must never be adopted
        let mut claimed: HashSet<String> =
            prior.entries().map(|e| e.remote_id.clone()).collect();
        for idx in tree.flat() {
            let node = tree.node(idx);
            let renamed_from = sources.get(node.path.as_str()).copied();
            let entry = prior_entry(prior, &node.path, renamed_from);

            let parent_id = match tree.parent(idx) {
                Some(p) => tree.node(p).remote_id.clone(),
                None => Some(self.config.ancestor_id.clone()),
            };
            let Some(parent_id) = parent_id else {
                warn!(path = %node.path, "Skipping page whose parent failed");
                report.fail(&node.path, "parent page was not published");
                carry_forward(entry, &node.path, inventory);
                continue;
            };

            match self.publish_node(node, entry, renamed_from, &parent_id, &claimed) {
                Ok((remote_id, action)) => {
                    claimed.insert(remote_id.clone());
                    inventory.insert(PageInventoryEntry::published(
                        node,
                        remote_id.clone(),
                        &parent_id,
                    ));
                    report.record(&node.path, action);
                    tree.set_remote_id(idx, remote_id);
                }
                Err(e) => {
                    warn!(path = %node.path, error = %e, "Failed to publish page");
                    report.fail(&node.path, &e);
                    carry_forward(entry, &node.path, inventory);
                }
            }
        }
    }

    /// Bring one page up to date. Returns its remote id and what was done.
    fn publish_node(
        &self,
        node: &PageNode,
        entry: Option<&PageInventoryEntry>,
        renamed_from: Option<&str>,
        parent_id: &str,
        claimed: &HashSet<String>,
    ) -> Result<(String, PageAction), ServiceError> {
        if let Some(entry) = entry {
            if renamed_from.is_none() && entry.is_current(node, Some(parent_id)) {
                debug!(path = %node.path, "Page unchanged");
                return Ok((entry.remote_id.clone(), PageAction::Unchanged));
            }
            match self.update_node(&entry.remote_id, node, parent_id) {
                Ok(()) => {
                    let action = match renamed_from {
                        Some(from) => PageAction::Renamed {
                            from: from.to_owned(),
                        },
                        None => PageAction::Updated,
                    };
                    return Ok((entry.remote_id.clone(), action));
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        path = %node.path,
                        page_id = %entry.remote_id,
                        "Published page no longer exists, creating it again"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        let remote_id = self.create_node(node, parent_id, claimed)?;
        Ok((remote_id, PageAction::Created))
    }

    fn update_node(&self, id: &str, node: &PageNode, parent_id: &str) -> Result<(), ServiceError> {
        let current = self.client.get_page(id)?;
        let update = PageUpdate {
            parent_id,
            title: &node.title,
            content: &node.content,
        };
        let version = self.client.update_page(id, &update, current.version)?;
        info!(path = %node.path, page_id = %id, version, "Updated page");
        self.upload_attachments(id, node)
    }

    fn create_node(
        &self,
        node: &PageNode,
        parent_id: &str,
        claimed: &HashSet<String>,
    ) -> Result<String, ServiceError> {
        // Unclaimed pages with this title were left behind by an interrupted run
        match self.client.find_page(&node.title, parent_id)? {
            Some(existing) if claimed.contains(&existing) => {
                warn!(
                    path = %node.path,
                    page_id = %existing,
                    title = %node.title,
                    "Page with this title belongs to another path, not adopting it"
                );
            }
            Some(existing) => {
                info!(path = %node.path, page_id = %existing, "Adopting existing page");
                self.update_node(&existing, node, parent_id)?;
                return Ok(existing);
            }
            None => {}
        }
        let page = self
            .client
            .create_page(parent_id, &node.title, &node.content)?;
        info!(path = %node.path, page_id = %page.id, title = %node.title, "Created page");
        self.upload_attachments(&page.id, node)?;
        Ok(page.id)
    }

    fn upload_attachments(&self, page_id: &str, node: &PageNode) -> Result<(), ServiceError> {
        for attachment in &node.attachments {
            self.client.upload_attachment(page_id, attachment)?;
            debug!(page_id = %page_id, filename = %attachment.filename, "Uploaded attachment");
        }
        Ok(())
    }

    /// Build the page tree, keeping the titles of `prior` where possible.
    fn build_tree(
        &self,
        files: &[FileArtifact],
        prior: Option<&Inventory>,
    ) -> Result<PageTree, TreeError> {
        let titles: HashMap<String, String> = prior.map(Inventory::titles).unwrap_or_default();
        let tree = PageTreeBuilder::new(&self.config.tree)
            .with_titles(&titles)
            .build(files)?;
        info!(pages = tree.len(), "Built page tree");
        Ok(tree)
    }

    fn state_store(&self) -> StateStore {
        StateStore::new(&self.config.state_title, &self.config.ancestor_id)
    }
}

fn decode_inventory(handle: &StateHandle) -> Result<Inventory, PublishError> {
    Inventory::from_json(&handle.value).map_err(PublishError::Inventory)
}

/// Prior entry describing the remote page for `path`.
fn prior_entry<'i>(
    prior: &'i Inventory,
    path: &str,
    renamed_from: Option<&str>,
) -> Option<&'i PageInventoryEntry> {
    prior.get(renamed_from.unwrap_or(path))
}

/// Keep a failed page's previous entry, keyed by its current path.
fn carry_forward(entry: Option<&PageInventoryEntry>, path: &str, inventory: &mut Inventory) {
    if let Some(entry) = entry {
        inventory.insert(PageInventoryEntry {
            path: path.to_owned(),
            ..entry.clone()
        });
    }
}

fn state_write_failed(source: StateError, report: PublishReport) -> PublishError {
    error!(
        error = %source,
        "Remote pages were changed but the publish state could not be written; rerun to recover"
    );
    PublishError::StateWrite {
        source,
        report: Box::new(report),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::{MockService, ServiceCall};

    const ANCESTOR: &str = "100";

    fn html(path: &str, body: &str) -> FileArtifact {
        FileArtifact::new(path, format!("<html><body>{body}</body></html>"))
    }

    fn service() -> MockService {
        MockService::new().with_page(ANCESTOR, None, "Space home", "")
    }

    fn publisher(service: &MockService) -> Publisher<'_, MockService> {
        Publisher::new(service, PublisherConfig::new(ANCESTOR))
    }

    fn publish(service: &MockService, files: &[FileArtifact]) -> PublishReport {
        publisher(service).publish(files).unwrap()
    }

    fn stored_inventory(service: &MockService) -> Inventory {
        let handle = StateStore::new(DEFAULT_STATE_TITLE, ANCESTOR)
            .initialize(service)
            .unwrap()
            .unwrap();
        Inventory::from_json(&handle.value).unwrap()
    }

    fn remote_id(service: &MockService, path: &str) -> String {
        stored_inventory(service).get(path).unwrap().remote_id.clone()
    }

    /// Service with a state page (raw JSON body) and the pages it lists.
    fn seeded(entries: &[PageInventoryEntry]) -> MockService {
        let inventory: Inventory = entries.iter().cloned().collect();
        let mut service = service().with_page(
            "9",
            Some(ANCESTOR),
            DEFAULT_STATE_TITLE,
            inventory.to_json().unwrap(),
        );
        for entry in entries {
            service = service.with_page(
                entry.remote_id.clone(),
                Some(entry.parent_id.as_deref().unwrap_or(ANCESTOR)),
                entry.title.clone(),
                "",
            );
        }
        service
    }

    fn entry(path: &str, remote_id: &str, title: &str) -> PageInventoryEntry {
        PageInventoryEntry {
            path: path.to_owned(),
            remote_id: remote_id.to_owned(),
            content_fingerprint: "stale".to_owned(),
            title: title.to_owned(),
            parent_id: Some(ANCESTOR.to_owned()),
        }
    }

    fn site() -> Vec<FileArtifact> {
        vec![
            html("index.html", "home"),
            html("guide/index.html", "guide"),
            html("guide/setup.html", "setup"),
            html("faq.html", "faq"),
        ]
    }

    fn is_mutation(call: &ServiceCall) -> bool {
        matches!(
            call,
            ServiceCall::Create { .. }
                | ServiceCall::Update { .. }
                | ServiceCall::Delete { .. }
                | ServiceCall::Upload { .. }
        )
    }

    #[test]
    fn test_bootstrap_creates_every_page() {
        let service = service();

        let report = publish(&service, &site());

        assert_eq!(
            report.created,
            vec![
                "index.html",
                "faq.html",
                "guide/index.html",
                "guide/setup.html"
            ]
        );
        assert!(!report.has_failures());

        let inventory = stored_inventory(&service);
        assert_eq!(inventory.len(), 4);
        for entry in inventory.entries() {
            let page = service.page(&entry.remote_id).unwrap();
            assert_eq!(page.title, entry.title);
            assert_eq!(page.parent_id, entry.parent_id);
        }

        let home = remote_id(&service, "index.html");
        let guide = remote_id(&service, "guide/index.html");
        assert_eq!(
            service.page(&home).unwrap().parent_id.as_deref(),
            Some(ANCESTOR)
        );
        assert_eq!(
            service.page(&guide).unwrap().parent_id.as_deref(),
            Some(home.as_str())
        );
        assert_eq!(
            service
                .page(&remote_id(&service, "guide/setup.html"))
                .unwrap()
                .parent_id,
            Some(guide)
        );
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let service = service();
        publish(&service, &site());
        let state_id = service.page_by_title(DEFAULT_STATE_TITLE).unwrap().id;
        service.clear_calls();

        let report = publish(&service, &site());

        assert_eq!(report.unchanged.len(), 4);
        assert!(report.created.is_empty());
        assert!(report.updated.is_empty());
        assert!(report.renamed.is_empty());
        assert!(report.deleted.is_empty());

        // Only the state page is written
        let mutations: Vec<_> = service
            .calls()
            .into_iter()
            .filter(is_mutation)
            .collect();
        assert_eq!(
            mutations,
            vec![ServiceCall::Update {
                id: state_id,
                parent_id: ANCESTOR.to_owned(),
                title: DEFAULT_STATE_TITLE.to_owned(),
            }]
        );
    }

    #[test]
    fn test_parents_created_before_children() {
        let service = service();
        publish(&service, &site());

        let mut known: HashSet<String> = HashSet::from([ANCESTOR.to_owned()]);
        for call in service.calls() {
            if let ServiceCall::Create { parent_id, title } = call {
                assert!(
                    known.contains(&parent_id),
                    "'{title}' created before its parent {parent_id}"
                );
                known.insert(service.page_by_title(&title).unwrap().id);
            }
        }
    }

    #[test]
    fn test_rename_updates_page_in_place() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("a/b.html", "X")]);
        let original_id = remote_id(&service, "a/b.html");
        let page_count = service.pages().len();

        let report = publish(&service, &[html("index.html", "home"), html("a/c.html", "X")]);

        assert_eq!(
            report.renamed,
            vec![("a/b.html".to_owned(), "a/c.html".to_owned())]
        );
        assert!(report.created.is_empty());
        assert!(report.deleted.is_empty());
        assert_eq!(report.unchanged, vec!["index.html"]);

        let inventory = stored_inventory(&service);
        assert!(!inventory.contains("a/b.html"));
        assert_eq!(inventory.get("a/c.html").unwrap().remote_id, original_id);
        assert_eq!(service.page(&original_id).unwrap().title, "C");
        assert_eq!(service.pages().len(), page_count);
    }

    #[test]
    fn test_moved_and_edited_page_is_recreated() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("a/b.html", "X")]);
        let original_id = remote_id(&service, "a/b.html");

        let report = publish(&service, &[html("index.html", "home"), html("a/c.html", "Y")]);

        assert_eq!(report.deleted, vec!["a/b.html"]);
        assert_eq!(report.created, vec!["a/c.html"]);
        assert!(service.page(&original_id).is_none());
    }

    #[test]
    fn test_orphan_is_deleted() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("old/page.html", "old")]);
        let orphan_id = remote_id(&service, "old/page.html");

        let report = publish(&service, &[html("index.html", "home")]);

        assert_eq!(report.deleted, vec!["old/page.html"]);
        assert!(!report.has_failures());
        assert!(service.page(&orphan_id).is_none());
        assert!(!stored_inventory(&service).contains("old/page.html"));
    }

    #[test]
    fn test_orphan_already_gone_is_not_a_failure() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("old.html", "old")]);
        service.remove_page(&remote_id(&service, "old.html"));

        let report = publish(&service, &[html("index.html", "home")]);

        assert_eq!(report.deleted, vec!["old.html"]);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_deepest_orphans_deleted_first() {
        let service = service();
        publish(
            &service,
            &[
                html("index.html", "home"),
                html("a/index.html", "a"),
                html("a/b/index.html", "b"),
                html("a/b/c.html", "c"),
            ],
        );

        let report = publish(&service, &[html("index.html", "home")]);

        assert_eq!(
            report.deleted,
            vec!["a/b/c.html", "a/b/index.html", "a/index.html"]
        );
    }

    #[test]
    fn test_failed_deletion_stays_in_inventory() {
        let prior = entry("old/page.html", "7", "Old page");
        let service = seeded(std::slice::from_ref(&prior)).failing_delete("7");

        let report = publish(&service, &[html("index.html", "home")]);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "old/page.html");
        assert!(report.deleted.is_empty());
        assert_eq!(stored_inventory(&service).get("old/page.html"), Some(&prior));
    }

    #[test]
    fn test_failed_create_skips_subtree_only() {
        let service = service().failing_create("Guide");

        let report = publish(&service, &site());

        assert_eq!(report.created, vec!["index.html", "faq.html"]);
        let failed: Vec<_> = report.failed.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec!["guide/index.html", "guide/setup.html"]);
        assert!(report.has_failures());

        let inventory = stored_inventory(&service);
        assert_eq!(inventory.len(), 2);
        assert!(service.page_by_title("Setup").is_none());
    }

    #[test]
    fn test_failed_update_carries_prior_entry_forward() {
        let prior = [entry("index.html", "1", "Documentation"), {
            PageInventoryEntry {
                parent_id: Some("1".to_owned()),
                ..entry("faq.html", "2", "Faq")
            }
        }];
        let service = seeded(&prior).failing_update("2");

        let report = publish(
            &service,
            &[html("index.html", "home"), html("faq.html", "faq")],
        );

        assert_eq!(report.updated, vec!["index.html"]);
        assert_eq!(report.failed[0].path, "faq.html");
        let inventory = stored_inventory(&service);
        assert_eq!(inventory.get("faq.html"), Some(&prior[1]));
        assert_ne!(
            inventory.get("index.html").unwrap().content_fingerprint,
            "stale"
        );
    }

    #[test]
    fn test_missing_remote_page_is_recreated() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("faq.html", "v1")]);
        let old_id = remote_id(&service, "faq.html");
        service.remove_page(&old_id);

        let report = publish(&service, &[html("index.html", "home"), html("faq.html", "v2")]);

        assert_eq!(report.created, vec!["faq.html"]);
        assert!(!report.has_failures());
        let new_id = remote_id(&service, "faq.html");
        assert_ne!(new_id, old_id);
        assert_eq!(service.page(&new_id).unwrap().content, "v2");
    }

    #[test]
    fn test_existing_page_with_same_title_is_adopted() {
        // Left over from a run that was interrupted before writing state
        let service = service().with_page("55", Some(ANCESTOR), "Documentation", "stale");

        let report = publish(&service, &[html("index.html", "home")]);

        assert_eq!(report.created, vec!["index.html"]);
        assert_eq!(remote_id(&service, "index.html"), "55");
        assert_eq!(service.page("55").unwrap().content, "home");
        assert!(!service.calls().iter().any(|call| matches!(
            call,
            ServiceCall::Create { title, .. } if title == "Documentation"
        )));
    }

    #[test]
    fn test_page_owned_by_another_path_is_not_adopted() {
        // z.html still owns page 5, which carries the title thing.html derives
        let service = seeded(&[entry("z.html", "5", "Thing")]);
        let files = [html("thing.html", "new"), html("z.html", "zed")];

        let report = publish(&service, &files);

        assert!(!service.calls().iter().any(|call| matches!(
            call,
            ServiceCall::Update { id, title, .. } if id == "5" && title == "Thing"
        )));
        let failed: Vec<_> = report.failed.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec!["thing.html"]);
        assert_eq!(report.updated, vec!["z.html"]);
        let page = service.page("5").unwrap();
        assert_eq!(page.title, "Z");
        assert_eq!(page.content, "zed");
        let inventory = stored_inventory(&service);
        assert_eq!(inventory.get("z.html").unwrap().remote_id, "5");
        assert!(!inventory.contains("thing.html"));

        // The title is free once its owner moved on
        let report = publish(&service, &files);
        assert_eq!(report.created, vec!["thing.html"]);
        assert_eq!(report.unchanged, vec!["z.html"]);
        assert_ne!(remote_id(&service, "thing.html"), "5");
    }

    #[test]
    fn test_new_page_does_not_take_title_of_existing_page() {
        let service = service();
        let before = [
            html("index.html", "home"),
            html("a/index.html", "a"),
            html("a/setup.html", "nested"),
        ];
        publish(&service, &before);
        let setup_id = remote_id(&service, "a/setup.html");

        let mut after = before.to_vec();
        after.push(html("Setup.html", "top"));
        let report = publish(&service, &after);

        assert!(!report.has_failures());
        assert_eq!(report.created, vec!["Setup.html"]);
        assert!(report.unchanged.contains(&"a/setup.html".to_owned()));

        let inventory = stored_inventory(&service);
        let ids: HashSet<&str> = inventory.entries().map(|e| e.remote_id.as_str()).collect();
        assert_eq!(ids.len(), inventory.len());
        assert_eq!(inventory.get("a/setup.html").unwrap().remote_id, setup_id);
        let nested = service.page(&setup_id).unwrap();
        assert_eq!(nested.title, "Setup");
        assert_eq!(nested.content, "nested");
        let top = service.page(&remote_id(&service, "Setup.html")).unwrap();
        assert_eq!(top.title, "Setup (/)");
        assert_eq!(top.content, "top");
    }

    #[test]
    fn test_earlier_sibling_with_same_title_is_created_without_conflict() {
        let service = service();
        let before = [
            html("index.html", "home"),
            html("a/index.html", "a"),
            html("a/setup.html", "nested"),
        ];
        publish(&service, &before);

        let mut after = before.to_vec();
        after.extend([html("0/index.html", "zero"), html("0/setup.html", "setup")]);
        let report = publish(&service, &after);

        assert!(!report.has_failures(), "{:?}", report.failed);
        assert_eq!(report.created, vec!["0/index.html", "0/setup.html"]);
        assert!(report.updated.is_empty());
        assert_eq!(
            service
                .page(&remote_id(&service, "0/setup.html"))
                .unwrap()
                .title,
            "Setup (0)"
        );
        assert_eq!(
            service
                .page(&remote_id(&service, "a/setup.html"))
                .unwrap()
                .title,
            "Setup"
        );
    }

    #[test]
    fn test_parent_change_updates_page() {
        let service = service();
        publish(&service, &[html("index.html", "home"), html("guide/setup.html", "setup")]);
        let setup_id = remote_id(&service, "guide/setup.html");

        let report = publish(
            &service,
            &[
                html("index.html", "home"),
                html("guide/index.html", "guide"),
                html("guide/setup.html", "setup"),
            ],
        );

        assert_eq!(report.created, vec!["guide/index.html"]);
        assert_eq!(report.updated, vec!["guide/setup.html"]);
        let guide_id = remote_id(&service, "guide/index.html");
        assert_eq!(service.page(&setup_id).unwrap().parent_id, Some(guide_id));
    }

    #[test]
    fn test_attachments_follow_content() {
        let service = service();
        publish(
            &service,
            &[
                html("index.html", "home"),
                FileArtifact::new("logo.png", b"v1".to_vec()),
            ],
        );
        let home = remote_id(&service, "index.html");
        assert_eq!(
            service.page(&home).unwrap().attachments["logo.png"],
            b"v1".to_vec()
        );

        let report = publish(
            &service,
            &[
                html("index.html", "home"),
                FileArtifact::new("logo.png", b"v2".to_vec()),
            ],
        );

        assert_eq!(report.updated, vec!["index.html"]);
        assert_eq!(
            service.page(&home).unwrap().attachments["logo.png"],
            b"v2".to_vec()
        );
    }

    #[test]
    fn test_state_write_failure_carries_report() {
        let service = service()
            .with_page("9", Some(ANCESTOR), DEFAULT_STATE_TITLE, "{}")
            .failing_update("9");

        let err = publish_err(&service, &[html("index.html", "home")]);

        match err {
            PublishError::StateWrite { report, .. } => {
                assert_eq!(report.created, vec!["index.html"]);
            }
            other => panic!("expected StateWrite, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_state_write_is_stale() {
        let service = service().with_page("9", Some(ANCESTOR), DEFAULT_STATE_TITLE, "{}");
        let handle = StateStore::new(DEFAULT_STATE_TITLE, ANCESTOR)
            .initialize(&service)
            .unwrap()
            .unwrap();
        let store = StateStore::new(DEFAULT_STATE_TITLE, ANCESTOR);
        service.bump_version("9");

        let mut tree = PageTree::default();
        let err = publisher(&service)
            .synchronize(&store, &handle, &Inventory::new(), &mut tree)
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::StateWrite {
                source: StateError::Stale { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_state_aborts_before_mutations() {
        let service = service().with_page("9", Some(ANCESTOR), DEFAULT_STATE_TITLE, "{oops");

        let err = publish_err(&service, &site());

        assert!(matches!(err, PublishError::Inventory(_)));
        assert!(!service.calls().iter().any(is_mutation));
    }

    #[test]
    fn test_malformed_path_aborts_before_remote_calls() {
        let service = service();

        let err = publish_err(&service, &[html("../escape.html", "x")]);

        assert!(matches!(err, PublishError::Tree(_)));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_skip_has_no_side_effects() {
        let service = service();
        let config = PublisherConfig {
            skip: true,
            ..PublisherConfig::new(ANCESTOR)
        };

        let report = Publisher::new(&service, config)
            .run(Path::new("/definitely/missing"))
            .unwrap();

        assert!(report.skipped);
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_plan_honours_skip() {
        let service = service();
        let config = PublisherConfig {
            skip: true,
            ..PublisherConfig::new(ANCESTOR)
        };

        let plan = Publisher::new(&service, config).plan(&site()).unwrap();

        assert!(plan.skipped);
        assert!(plan.pages.is_empty());
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_run_missing_directory() {
        let service = service();
        let err = publisher(&service)
            .run(Path::new("/definitely/missing"))
            .unwrap_err();
        assert!(matches!(err, PublishError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_run_reads_output_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("guide")).unwrap();
        fs::write(temp_dir.path().join("index.html"), "<p>home</p>").unwrap();
        fs::write(temp_dir.path().join("guide/setup.html"), "<p>setup</p>").unwrap();
        let service = service();

        let report = publisher(&service).run(temp_dir.path()).unwrap();

        assert_eq!(report.created, vec!["index.html", "guide/setup.html"]);
    }

    #[test]
    fn test_plan_bootstrap() {
        let service = service();

        let plan = publisher(&service).plan(&site()).unwrap();

        assert!(plan.bootstrap);
        assert_eq!(plan.create().len(), 4);
        assert!(service.calls().iter().all(|c| !is_mutation(c)));
    }

    #[test]
    fn test_plan_matches_publish() {
        let service = service();
        publish(
            &service,
            &[
                html("index.html", "home"),
                html("a/b.html", "X"),
                html("old.html", "old"),
                html("faq.html", "v1"),
            ],
        );
        service.clear_calls();
        let next = [
            html("index.html", "home"),
            html("a/c.html", "X"),
            html("faq.html", "v2"),
            html("new.html", "new"),
        ];

        let plan = publisher(&service).plan(&next).unwrap();

        assert!(!plan.bootstrap);
        assert_eq!(plan.unchanged(), vec!["index.html"]);
        assert_eq!(plan.rename(), vec![("a/b.html", "a/c.html")]);
        assert_eq!(plan.update(), vec!["faq.html"]);
        assert_eq!(plan.create(), vec!["new.html"]);
        assert_eq!(plan.delete, vec!["old.html"]);
        assert!(!service.calls().iter().any(is_mutation));

        let report = publish(&service, &next);
        assert_eq!(report.unchanged, vec!["index.html"]);
        assert_eq!(report.updated, vec!["faq.html"]);
        assert_eq!(report.created, vec!["new.html"]);
        assert_eq!(report.deleted, vec!["old.html"]);
    }

    fn publish_err(service: &MockService, files: &[FileArtifact]) -> PublishError {
        publisher(service).publish(files).unwrap_err()
    }
}
