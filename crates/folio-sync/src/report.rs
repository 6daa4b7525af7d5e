//! Run report and dry-run plan.

/// What happened to a page during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageAction {
    /// A new remote page was created (or an existing one adopted).
    Created,
    /// The page's content, title or parent changed.
    Updated,
    /// The page moved from another path and kept its remote identity.
    Renamed {
        /// Path at the last publish.
        from: String,
    },
    /// Nothing was sent.
    Unchanged,
}

/// A page that could not be published or deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFailure {
    /// Page path.
    pub path: String,
    /// Error message.
    pub reason: String,
}

/// Outcome of a publish run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// The run was skipped by configuration.
    pub skipped: bool,
    /// Paths of created pages.
    pub created: Vec<String>,
    /// Paths of updated pages.
    pub updated: Vec<String>,
    /// `(old path, new path)` of renamed pages.
    pub renamed: Vec<(String, String)>,
    /// Paths of unchanged pages.
    pub unchanged: Vec<String>,
    /// Paths of deleted pages.
    pub deleted: Vec<String>,
    /// Pages that failed to publish or delete.
    pub failed: Vec<PageFailure>,
}

impl PublishReport {
    /// Report of a skipped run.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// True if any page failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Record a published page.
    pub fn record(&mut self, path: &str, action: PageAction) {
        let path = path.to_owned();
        match action {
            PageAction::Created => self.created.push(path),
            PageAction::Updated => self.updated.push(path),
            PageAction::Renamed { from } => self.renamed.push((from, path)),
            PageAction::Unchanged => self.unchanged.push(path),
        }
    }

    /// Record a failed page.
    pub fn fail(&mut self, path: &str, reason: impl std::fmt::Display) {
        self.failed.push(PageFailure {
            path: path.to_owned(),
            reason: reason.to_string(),
        });
    }
}

/// Action a dry run predicts for a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedAction {
    /// Page would be created.
    Create,
    /// Page would be updated in place.
    Update,
    /// Page would take over the remote page of `from`.
    Rename {
        /// Path at the last publish.
        from: String,
    },
    /// Page would not be touched.
    Unchanged,
}

/// What a publish run would do, computed without remote mutations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishPlan {
    /// Publishing is skipped by configuration; nothing would happen.
    pub skipped: bool,
    /// No state page exists yet; every page would be created.
    pub bootstrap: bool,
    /// `(path, action)` for every page in flat order.
    pub pages: Vec<(String, PlannedAction)>,
    /// Paths of prior pages that would be deleted.
    pub delete: Vec<String>,
}

impl PublishPlan {
    /// Plan of a skipped run.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Paths planned for the given action kind.
    fn paths_where(&self, pred: impl Fn(&PlannedAction) -> bool) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|(_, action)| pred(action))
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Paths that would be created.
    #[must_use]
    pub fn create(&self) -> Vec<&str> {
        self.paths_where(|a| *a == PlannedAction::Create)
    }

    /// Paths that would be updated.
    #[must_use]
    pub fn update(&self) -> Vec<&str> {
        self.paths_where(|a| *a == PlannedAction::Update)
    }

    /// `(old path, new path)` pairs that would be renamed.
    #[must_use]
    pub fn rename(&self) -> Vec<(&str, &str)> {
        self.pages
            .iter()
            .filter_map(|(path, action)| match action {
                PlannedAction::Rename { from } => Some((from.as_str(), path.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Paths that would stay untouched.
    #[must_use]
    pub fn unchanged(&self) -> Vec<&str> {
        self.paths_where(|a| *a == PlannedAction::Unchanged)
    }
}
