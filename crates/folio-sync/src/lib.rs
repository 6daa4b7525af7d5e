//! Page tree reconciliation and publishing core for Folio.
//!
//! Turns a generated documentation tree into a hierarchy of remote pages and
//! keeps that hierarchy in sync across runs. The crate provides:
//!
//! - [`PageTreeBuilder`]: builds an ordered [`PageTree`] from [`FileArtifact`]s
//! - [`Inventory`]: the durable record of what was published last time
//! - [`StateStore`]: persists the inventory in a dedicated remote page
//! - [`reconcile`]: classifies prior pages as renamed or orphaned
//! - [`Publisher`]: drives a full run against a [`ContentService`]
//! - [`MockService`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use folio_sync::{Publisher, PublisherConfig};
//!
//! let publisher = Publisher::new(&client, PublisherConfig::new("123456"));
//! let report = publisher.run(Path::new("build/site"))?;
//! println!("{} pages created", report.created.len());
//! ```

mod artifact;
mod content;
mod fingerprint;
mod inventory;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod publisher;
mod reconcile;
mod report;
mod service;
mod state;
mod tree;

pub use artifact::{FileArtifact, collect_artifacts};
pub use fingerprint::fingerprint;
pub use inventory::{Inventory, PageInventoryEntry};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockPage, MockService, ServiceCall};
pub use publisher::{DEFAULT_STATE_TITLE, PublishError, Publisher, PublisherConfig};
pub use reconcile::{ReconciliationResult, reconcile};
pub use report::{PageAction, PageFailure, PlannedAction, PublishPlan, PublishReport};
pub use service::{
    ContentService, DeleteOutcome, PageUpdate, RemotePage, ServiceError, ServiceErrorKind,
};
pub use state::{StateError, StateHandle, StateStore};
pub use tree::{Attachment, PageNode, PageTree, PageTreeBuilder, TreeConfig, TreeError};
