//! `folio publish` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use folio_config::{
    AuthMethod, CliSettings, Config, ConfluenceConfig, EditorVersion, PublishConfig,
};
use folio_confluence::ConfluenceClient;
use folio_sync::{
    FileArtifact, PublishError, PublishPlan, PublishReport, Publisher, PublisherConfig,
    TreeConfig, collect_artifacts,
};
use tracing::info;

use crate::error::CliError;
use crate::output::Output;

/// Shown when pages changed but the new publish state could not be stored.
const STATE_NOT_SAVED: [&str; 2] = [
    "Remote pages were changed but the publish state was not saved.",
    "Rerun publish to recover: pages created by this run are adopted again by title.",
];

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Documentation output directory (overrides config).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Confluence space key (overrides config).
    #[arg(long)]
    space: Option<String>,

    /// Page under which the documentation is published (overrides config).
    #[arg(long)]
    ancestor_id: Option<String>,

    /// Prepend a "generated content" banner to every page.
    #[arg(long)]
    show_banner: bool,

    /// Skip publishing entirely.
    #[arg(long)]
    skip: bool,

    /// Show what would change without modifying Confluence.
    #[arg(long)]
    dry_run: bool,

    /// Path to OAuth private key file.
    #[arg(short = 'k', long, env = "FOLIO_KEY_FILE", default_value = "private_key.pem")]
    key_file: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl PublishArgs {
    /// Execute the publish command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the run aborts, or any
    /// page failed to publish.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        if let Some(path) = &config.config_path {
            info!("Loaded configuration from {}", path.display());
        }
        let publish = &config.publish_resolved;

        if publish.skip {
            output.warning("Publishing skipped by configuration.");
            return Ok(());
        }

        let confluence = config.require_confluence()?;
        let client = create_confluence_client(confluence, &self.key_file)?;
        let publisher = Publisher::new(
            &client,
            publisher_config(publish, &confluence.ancestor_id),
        );

        output.info(&format!(
            "Publishing {} to space {} under page {}...",
            publish.output_dir.display(),
            confluence.space_key,
            confluence.ancestor_id
        ));

        if self.dry_run {
            let files = read_output_dir(&publish.output_dir)?;
            let plan = publisher.plan(&files)?;
            print_plan(output, &plan);
            return Ok(());
        }

        match publisher.run(&publish.output_dir) {
            Ok(report) => {
                print_report(output, &report);
                check_failures(&report)
            }
            Err(PublishError::StateWrite { source, report }) => {
                print_report(output, &report);
                for line in STATE_NOT_SAVED {
                    output.error(line);
                }
                Err(PublishError::StateWrite { source, report }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            output_dir: self.output_dir.clone(),
            space_key: self.space.clone(),
            ancestor_id: self.ancestor_id.clone(),
            show_banner: self.show_banner.then_some(true),
            skip: self.skip.then_some(true),
        }
    }
}

fn create_confluence_client(
    conf_config: &ConfluenceConfig,
    key_file: &Path,
) -> Result<ConfluenceClient, CliError> {
    let client = match conf_config.auth {
        AuthMethod::OAuth => ConfluenceClient::with_oauth(
            &conf_config.base_url,
            &conf_config.space_key,
            &conf_config.consumer_key,
            key_file,
            &conf_config.access_token,
        )?,
        AuthMethod::Bearer => ConfluenceClient::with_bearer(
            &conf_config.base_url,
            &conf_config.space_key,
            &conf_config.access_token,
        ),
    };
    Ok(client.with_editor(editor_version(conf_config.editor_version)))
}

fn editor_version(version: EditorVersion) -> folio_confluence::EditorVersion {
    match version {
        EditorVersion::V1 => folio_confluence::EditorVersion::V1,
        EditorVersion::V2 => folio_confluence::EditorVersion::V2,
    }
}

fn publisher_config(publish: &PublishConfig, ancestor_id: &str) -> PublisherConfig {
    PublisherConfig {
        tree: TreeConfig {
            index_name: publish.index_name.clone(),
            page_extensions: publish.page_extensions.clone(),
            asset_extensions: publish.asset_extensions.clone(),
            title_prefix: publish.title_prefix.clone(),
            root_title: publish.root_title.clone(),
            show_banner: publish.show_banner,
            extract_body: publish.extract_body,
        },
        ancestor_id: ancestor_id.to_owned(),
        state_title: publish.state_title.clone(),
        skip: publish.skip,
    }
}

fn read_output_dir(dir: &Path) -> Result<Vec<FileArtifact>, CliError> {
    if !dir.is_dir() {
        return Err(PublishError::DirectoryNotFound(dir.to_path_buf()).into());
    }
    Ok(collect_artifacts(dir)?)
}

fn check_failures(report: &PublishReport) -> Result<(), CliError> {
    if report.has_failures() {
        return Err(CliError::PagesFailed {
            count: report.failed.len(),
        });
    }
    Ok(())
}

fn print_paths(output: &Output, heading: &str, marker: &str, paths: &[impl AsRef<str>]) {
    if paths.is_empty() {
        return;
    }
    output.info(&format!("\n{heading} ({}):", paths.len()));
    for path in paths {
        output.info(&format!("  {marker} {}", path.as_ref()));
    }
}

fn print_report(output: &Output, report: &PublishReport) {
    if report.skipped {
        output.warning("Publishing skipped by configuration.");
        return;
    }

    print_paths(output, "Created", "+", &report.created);
    print_paths(output, "Updated", "~", &report.updated);
    if !report.renamed.is_empty() {
        output.info(&format!("\nRenamed ({}):", report.renamed.len()));
        for (from, to) in &report.renamed {
            output.info(&format!("  {from} -> {to}"));
        }
    }
    print_paths(output, "Deleted", "-", &report.deleted);
    output.muted(&format!("\nUnchanged: {}", report.unchanged.len()));

    if report.failed.is_empty() {
        output.success("\nPublish completed successfully!");
    } else {
        output.warning(&format!("\nFailed ({}):", report.failed.len()));
        for failure in &report.failed {
            output.error(&format!("  ! {}: {}", failure.path, failure.reason));
        }
    }
}

fn print_plan(output: &Output, plan: &PublishPlan) {
    if plan.skipped {
        output.warning("Publishing skipped by configuration.");
        return;
    }
    output.highlight("\n[DRY RUN] No changes made.");
    if plan.bootstrap {
        output.info("No publish state found; every page would be created.");
    }

    print_paths(output, "Would create", "+", &plan.create());
    print_paths(output, "Would update", "~", &plan.update());
    let renames = plan.rename();
    if !renames.is_empty() {
        output.info(&format!("\nWould rename ({}):", renames.len()));
        for (from, to) in renames {
            output.info(&format!("  {from} -> {to}"));
        }
    }
    print_paths(output, "Would delete", "-", &plan.delete);
    output.muted(&format!("\nUnchanged: {}", plan.unchanged().len()));
}
