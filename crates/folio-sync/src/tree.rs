//! Page hierarchy built from generated artifacts.
//!
//! # Architecture
//!
//! Pages are stored in a flat `Vec<PageNode>` with parent/children
//! relationships tracked by indices. Nodes are laid out in depth-first
//! pre-order with siblings sorted by path, so index order is the flat
//! traversal order: every parent precedes its children.
//!
//! The hierarchy follows the directory structure:
//! - a directory's index artifact (e.g. `index.html`) is the parent of the
//!   other pages in that directory and of its sub-directories' index pages
//! - directories without an index artifact have their children promoted to
//!   the nearest ancestor directory that has one
//! - pages with no owning index at all become roots
//!
//! Asset artifacts (images and similar) are not pages; they are attached to
//! the page owning their directory.
//!
//! Titles must be unique across the tree. When two pages derive the same
//! title the later one in flat order gets its location appended, unless the
//! builder was given the titles of a previous run: a page keeps its previous
//! title whenever that title is still one it could derive.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::artifact::FileArtifact;
use crate::content::{BANNER, extract_body, guess_content_type, humanize};
use crate::fingerprint::fingerprint;

/// Configuration for [`PageTreeBuilder`].
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// File name of a directory's landing artifact.
    pub index_name: String,
    /// Extensions (without dot, lowercase) of artifacts that become pages.
    pub page_extensions: Vec<String>,
    /// Extensions (without dot, lowercase) of artifacts attached to pages.
    pub asset_extensions: Vec<String>,
    /// Prefix prepended to every page title.
    pub title_prefix: Option<String>,
    /// Title of the root index page.
    pub root_title: String,
    /// Prepend the generated-content banner to every page.
    pub show_banner: bool,
    /// Publish only the inner HTML of `<body>`.
    pub extract_body: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            index_name: "index.html".to_owned(),
            page_extensions: vec!["html".to_owned()],
            asset_extensions: ["png", "jpg", "jpeg", "gif", "svg"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            title_prefix: None,
            root_title: "Documentation".to_owned(),
            show_banner: false,
            extract_body: true,
        }
    }
}

/// Error returned when artifacts cannot be arranged into a page tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Artifact path cannot be placed in the hierarchy.
    #[error("Malformed artifact path '{path}': {reason}")]
    MalformedPath {
        /// Offending path as given.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl TreeError {
    fn malformed(path: &str, reason: &'static str) -> Self {
        Self::MalformedPath {
            path: path.to_owned(),
            reason,
        }
    }
}

/// File uploaded alongside a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// File name (unique per page).
    pub filename: String,
    /// Raw bytes.
    pub data: Vec<u8>,
    /// MIME type.
    pub content_type: &'static str,
}

/// A page in the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageNode {
    /// Normalized artifact path; the stable key across runs.
    pub path: String,
    /// Page title (unique within the tree).
    pub title: String,
    /// Page body in storage format.
    pub content: String,
    /// Fingerprint of `content` and `attachments`.
    pub fingerprint: String,
    /// Assets owned by this page, sorted by file name.
    pub attachments: Vec<Attachment>,
    /// Remote page id, once known in the current run.
    pub remote_id: Option<String>,
}

/// Ordered page hierarchy with O(1) path lookups.
#[derive(Debug, Default)]
pub struct PageTree {
    nodes: Vec<PageNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    roots: Vec<usize>,
    path_index: HashMap<String, usize>,
}

impl PageTree {
    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn node(&self, idx: usize) -> &PageNode {
        &self.nodes[idx]
    }

    /// Index of the node with the given path.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.path_index.get(path).copied()
    }

    /// Node with the given path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PageNode> {
        self.index_of(path).map(|i| &self.nodes[i])
    }

    /// True if a node with the given path exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.path_index.contains_key(path)
    }

    /// Parent index of `idx`, `None` for roots.
    #[must_use]
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    /// Child indices of `idx` in path order.
    #[must_use]
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Root indices in path order.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Indices in flat traversal order (parents before children, then lexical).
    pub fn flat(&self) -> std::ops::Range<usize> {
        0..self.nodes.len()
    }

    /// Nodes in flat traversal order.
    pub fn nodes(&self) -> impl Iterator<Item = &PageNode> {
        self.nodes.iter()
    }

    /// Record the remote id of a node once it exists remotely.
    pub fn set_remote_id(&mut self, idx: usize, remote_id: String) {
        self.nodes[idx].remote_id = Some(remote_id);
    }
}

/// Page artifact before placement in the arena.
struct PendingPage<'a> {
    path: String,
    dir: String,
    is_index: bool,
    content: &'a [u8],
}

/// Builds a [`PageTree`] from artifacts.
pub struct PageTreeBuilder<'a> {
    config: &'a TreeConfig,
    prior_titles: Option<&'a HashMap<String, String>>,
}

impl<'a> PageTreeBuilder<'a> {
    /// Create a builder with the given configuration.
    #[must_use]
    pub fn new(config: &'a TreeConfig) -> Self {
        Self {
            config,
            prior_titles: None,
        }
    }

    /// Titles of a previous run, keyed by page path.
    ///
    /// A page keeps its previous title if it is still one of the page's
    /// derivable titles and no other page kept it first (in path order).
    /// Existing pages then never lose their title to a newly added page.
    #[must_use]
    pub fn with_titles(mut self, titles: &'a HashMap<String, String>) -> Self {
        self.prior_titles = Some(titles);
        self
    }

    /// Build the page tree.
    ///
    /// Deterministic: the same artifact set always yields the same shape,
    /// titles and fingerprints, regardless of input order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::MalformedPath`] if an artifact path is empty,
    /// absolute, escapes the output root, contains empty segments, is
    /// duplicated, or is an asset with no owning page.
    pub fn build(&self, files: &[FileArtifact]) -> Result<PageTree, TreeError> {
        let mut seen = HashSet::new();
        let mut pages = Vec::new();
        let mut assets = Vec::new();

        for file in files {
            let path = normalize_path(&file.path)?;
            if !seen.insert(path.clone()) {
                return Err(TreeError::malformed(&file.path, "duplicate path"));
            }
            let (dir, name) = split_path(&path);
            let ext = extension(name);
            if self.config.page_extensions.contains(&ext) {
                pages.push(PendingPage {
                    is_index: name == self.config.index_name,
                    dir: dir.to_owned(),
                    path,
                    content: &file.content,
                });
            } else if self.config.asset_extensions.contains(&ext) {
                assets.push((path, &file.content));
            } else {
                debug!(path = %path, "Skipping artifact that is neither page nor asset");
            }
        }

        // Directory -> index page path
        let index_by_dir: HashMap<&str, &str> = pages
            .iter()
            .filter(|p| p.is_index)
            .map(|p| (p.dir.as_str(), p.path.as_str()))
            .collect();

        let mut parent_of: HashMap<&str, Option<&str>> = HashMap::new();
        for page in &pages {
            let owner = if page.is_index {
                if page.dir.is_empty() {
                    None
                } else {
                    owning_index(&index_by_dir, parent_dir(&page.dir))
                }
            } else {
                owning_index(&index_by_dir, Some(page.dir.as_str()))
            };
            parent_of.insert(page.path.as_str(), owner);
        }

        let mut attachments: HashMap<&str, BTreeMap<String, Attachment>> = HashMap::new();
        for (path, data) in &assets {
            let (dir, name) = split_path(path);
            let owner = owning_index(&index_by_dir, Some(dir))
                .ok_or_else(|| TreeError::malformed(path, "asset has no owning page"))?;
            let owned = attachments.entry(owner).or_default();
            if owned.contains_key(name) {
                return Err(TreeError::malformed(path, "duplicate attachment name"));
            }
            owned.insert(
                name.to_owned(),
                Attachment {
                    filename: name.to_owned(),
                    data: data.to_vec(),
                    content_type: guess_content_type(name),
                },
            );
        }

        // Parent path -> sorted child paths
        let mut child_paths: BTreeMap<Option<&str>, Vec<&PendingPage<'_>>> = BTreeMap::new();
        for page in &pages {
            child_paths
                .entry(parent_of[page.path.as_str()])
                .or_default()
                .push(page);
        }
        for siblings in child_paths.values_mut() {
            siblings.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let mut arena = Arena::default();
        let mut titles = self.keep_prior_titles(&pages);
        let roots = child_paths.get(&None).cloned().unwrap_or_default();
        for root in roots {
            self.place(
                root,
                None,
                &child_paths,
                &mut attachments,
                &mut titles,
                &mut arena,
            );
        }

        Ok(arena.finish())
    }

    /// Place `page` and its subtree in pre-order.
    fn place<'p>(
        &self,
        page: &'p PendingPage<'p>,
        parent: Option<usize>,
        child_paths: &BTreeMap<Option<&'p str>, Vec<&'p PendingPage<'p>>>,
        attachments: &mut HashMap<&str, BTreeMap<String, Attachment>>,
        titles: &mut TitleLedger,
        arena: &mut Arena,
    ) {
        let title = self.unique_title(page, titles);
        let owned: Vec<Attachment> = attachments
            .remove(page.path.as_str())
            .map(|by_name| by_name.into_values().collect())
            .unwrap_or_default();
        let content = self.transform(page.content);
        let node = PageNode {
            path: page.path.clone(),
            title,
            fingerprint: fingerprint(&content, &owned),
            content,
            attachments: owned,
            remote_id: None,
        };
        let idx = arena.push(node, parent);

        if let Some(children) = child_paths.get(&Some(page.path.as_str())) {
            for child in children {
                self.place(*child, Some(idx), child_paths, attachments, titles, arena);
            }
        }
    }

    fn transform(&self, raw: &[u8]) -> String {
        let text = String::from_utf8_lossy(raw);
        let body = if self.config.extract_body {
            extract_body(&text)
        } else {
            text.as_ref()
        };
        if self.config.show_banner {
            format!("{BANNER}\n{body}")
        } else {
            body.to_owned()
        }
    }

    fn base_title(&self, page: &PendingPage<'_>) -> String {
        let name = if page.is_index {
            if page.dir.is_empty() {
                return self.prefixed(&self.config.root_title);
            }
            split_path(&page.dir).1
        } else {
            let (_, file_name) = split_path(&page.path);
            file_name
                .rsplit_once('.')
                .map_or(file_name, |(stem, _)| stem)
        };
        self.prefixed(&humanize(name))
    }

    fn prefixed(&self, title: &str) -> String {
        match &self.config.title_prefix {
            Some(prefix) => format!("{prefix}{title}"),
            None => title.to_owned(),
        }
    }

    /// Derivable titles in order of preference: the base title, then the
    /// base title with the directory, then with the full path.
    fn title_candidates(&self, page: &PendingPage<'_>) -> [String; 3] {
        let base = self.base_title(page);
        let location = if page.dir.is_empty() { "/" } else { page.dir.as_str() };
        let with_dir = format!("{base} ({location})");
        let with_path = format!("{base} ({})", page.path);
        [base, with_dir, with_path]
    }

    /// Reserve previous titles that are still derivable.
    fn keep_prior_titles(&self, pages: &[PendingPage<'_>]) -> TitleLedger {
        let mut ledger = TitleLedger::default();
        let Some(prior) = self.prior_titles else {
            return ledger;
        };
        let mut by_path: Vec<&PendingPage<'_>> = pages.iter().collect();
        by_path.sort_by(|a, b| a.path.cmp(&b.path));
        for page in by_path {
            let Some(title) = prior.get(&page.path) else {
                continue;
            };
            if !ledger.used.contains(title) && self.title_candidates(page).contains(title) {
                ledger.used.insert(title.clone());
                ledger.kept.insert(page.path.clone(), title.clone());
            }
        }
        ledger
    }

    /// Titles are unique per space; later duplicates get their location appended.
    fn unique_title(&self, page: &PendingPage<'_>, ledger: &mut TitleLedger) -> String {
        if let Some(kept) = ledger.kept.get(&page.path) {
            return kept.clone();
        }
        let candidates = self.title_candidates(page);
        let title = match candidates.iter().find(|t| !ledger.used.contains(*t)) {
            Some(title) => title.clone(),
            None => format!("{} ({})", candidates[0], ledger.used.len()),
        };
        ledger.used.insert(title.clone());
        title
    }
}

/// Titles handed out so far.
#[derive(Default)]
struct TitleLedger {
    used: HashSet<String>,
    /// Path -> previous title reserved for it.
    kept: HashMap<String, String>,
}

/// Arena under construction.
#[derive(Default)]
struct Arena {
    nodes: Vec<PageNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    roots: Vec<usize>,
}

impl Arena {
    fn push(&mut self, node: PageNode, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.children.push(Vec::new());
        self.parents.push(parent);
        match parent {
            Some(p) => self.children[p].push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    fn finish(self) -> PageTree {
        let path_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.path.clone(), i))
            .collect();
        PageTree {
            nodes: self.nodes,
            children: self.children,
            parents: self.parents,
            roots: self.roots,
            path_index,
        }
    }
}

/// Normalize an artifact path to `seg/seg/name`.
fn normalize_path(raw: &str) -> Result<String, TreeError> {
    let unified = raw.replace('\\', "/");
    if unified.trim().is_empty() {
        return Err(TreeError::malformed(raw, "empty path"));
    }
    if unified.starts_with('/') || unified.as_bytes().get(1) == Some(&b':') {
        return Err(TreeError::malformed(raw, "absolute path"));
    }
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "." => {}
            "" => return Err(TreeError::malformed(raw, "empty path segment")),
            ".." => return Err(TreeError::malformed(raw, "path escapes the output root")),
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(TreeError::malformed(raw, "empty path"));
    }
    Ok(segments.join("/"))
}

/// Split a normalized path into (directory, file name).
fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

fn parent_dir(dir: &str) -> Option<&str> {
    if dir.is_empty() {
        None
    } else {
        Some(split_path(dir).0)
    }
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Nearest index page at or above `dir`.
fn owning_index<'a>(index_by_dir: &HashMap<&str, &'a str>, dir: Option<&str>) -> Option<&'a str> {
    let mut current = dir;
    while let Some(d) = current {
        if let Some(index) = index_by_dir.get(d) {
            return Some(*index);
        }
        current = parent_dir(d);
    }
    None
}
