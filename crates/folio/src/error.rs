//! CLI error types.

use folio_config::ConfigError;
use folio_confluence::ConfluenceError;
use folio_sync::PublishError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Confluence(#[from] ConfluenceError),

    #[error("{0}")]
    Publish(#[from] PublishError),

    #[error("{count} page(s) failed to publish")]
    PagesFailed { count: usize },
}
