//! Configuration management for Folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `publish.output_dir`
//! - `publish.title_prefix`
//! - `publish.root_title`
//! - `publish.state_title`
//! - `publish.skip` (when given as a string)
//! - the string fields of `[confluence]`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override Confluence space key.
    pub space_key: Option<String>,
    /// Override Confluence ancestor page id.
    pub ancestor_id: Option<String>,
    /// Override banner flag.
    pub show_banner: Option<bool>,
    /// Override skip flag.
    pub skip: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publish configuration (paths are relative strings from TOML).
    publish: PublishConfigRaw,
    /// Confluence configuration.
    pub confluence: Option<ConfluenceConfig>,

    /// Resolved publish configuration (set after loading).
    #[serde(skip)]
    pub publish_resolved: PublishConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Boolean that may also be written as a string, so it can come from `${VAR:-false}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Toggle {
    Bool(bool),
    Text(String),
}

/// Raw publish configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PublishConfigRaw {
    output_dir: Option<String>,
    index_name: Option<String>,
    page_extensions: Option<Vec<String>>,
    asset_extensions: Option<Vec<String>>,
    title_prefix: Option<String>,
    root_title: Option<String>,
    show_banner: Option<bool>,
    skip: Option<Toggle>,
    state_title: Option<String>,
    extract_body: Option<bool>,
}

/// Resolved publish configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Directory holding the generated site.
    pub output_dir: PathBuf,
    /// File name of a directory's landing page.
    pub index_name: String,
    /// Extensions (lowercase, without dot) of files published as pages.
    pub page_extensions: Vec<String>,
    /// Extensions (lowercase, without dot) of files attached to pages.
    pub asset_extensions: Vec<String>,
    /// Prefix prepended to every page title.
    pub title_prefix: Option<String>,
    /// Title of the root index page.
    pub root_title: String,
    /// Prepend the generated-content banner to every page.
    pub show_banner: bool,
    /// Skip publishing entirely.
    pub skip: bool,
    /// Title of the page holding the publish state.
    pub state_title: String,
    /// Publish only the inner HTML of `<body>`.
    pub extract_body: bool,
}

impl PublishConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            output_dir: base.join("build/site"),
            index_name: "index.html".to_owned(),
            page_extensions: vec!["html".to_owned()],
            asset_extensions: default_asset_extensions(),
            title_prefix: None,
            root_title: "Documentation".to_owned(),
            show_banner: false,
            skip: false,
            state_title: "Folio Publish State".to_owned(),
            extract_body: true,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

fn default_asset_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "svg"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// How requests to Confluence are authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// OAuth 1.0 with RSA-SHA1 signatures (needs a private key file).
    #[default]
    OAuth,
    /// Personal access token sent as a bearer token.
    Bearer,
}

/// Editor a newly created page is marked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorVersion {
    /// Legacy editor; Confluence's default for REST-created pages.
    #[default]
    V1,
    /// New (Fabric) editor.
    V2,
}

/// Confluence configuration.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence server base URL.
    pub base_url: String,
    /// Target space key.
    #[serde(default)]
    pub space_key: String,
    /// Page under which the documentation tree is published.
    #[serde(default)]
    pub ancestor_id: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// OAuth access token, or the personal access token for bearer auth.
    pub access_token: String,
    /// OAuth access token secret.
    #[serde(default)]
    pub access_secret: String,
    /// OAuth consumer key.
    #[serde(default = "default_consumer_key")]
    pub consumer_key: String,
    /// Editor for pages created by Folio.
    #[serde(default)]
    pub editor_version: EditorVersion,
}

impl ConfluenceConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        require_non_empty(&self.space_key, "confluence.space_key")?;
        require_non_empty(&self.ancestor_id, "confluence.ancestor_id")?;
        if !self.ancestor_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(
                "confluence.ancestor_id must be a numeric page id".to_owned(),
            ));
        }
        require_non_empty(&self.access_token, "confluence.access_token")?;
        if self.auth == AuthMethod::OAuth {
            require_non_empty(&self.access_secret, "confluence.access_secret")?;
            require_non_empty(&self.consumer_key, "confluence.consumer_key")?;
        }
        Ok(())
    }
}

fn default_consumer_key() -> String {
    "folio".to_owned()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.access_token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Parse a boolean written as text.
fn parse_toggle(value: &str, field: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(false),
        "true" | "1" | "yes" | "on" => Ok(true),
        other => Err(ConfigError::Validation(format!(
            "{field} must be a boolean, got '{other}'"
        ))),
    }
}

/// Lowercase extensions and strip a leading dot.
fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .collect()
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.publish_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(show_banner) = settings.show_banner {
            self.publish_resolved.show_banner = show_banner;
        }
        if let Some(skip) = settings.skip {
            self.publish_resolved.skip = skip;
        }
        if let Some(confluence) = self.confluence.as_mut() {
            if let Some(space_key) = &settings.space_key {
                confluence.space_key.clone_from(space_key);
            }
            if let Some(ancestor_id) = &settings.ancestor_id {
                confluence.ancestor_id.clone_from(ancestor_id);
            }
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// Returns the Confluence config if the `[confluence]` section is present
    /// and all fields are valid. Use this instead of accessing the `confluence`
    /// field directly when the command requires Confluence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            publish: PublishConfigRaw::default(),
            confluence: None,
            publish_resolved: PublishConfig::with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. The `[confluence]`
    /// section is validated separately by [`Config::require_confluence`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let publish = &self.publish_resolved;
        require_non_empty(&publish.index_name, "publish.index_name")?;
        if publish.index_name.contains('/') {
            return Err(ConfigError::Validation(
                "publish.index_name must be a file name, not a path".to_owned(),
            ));
        }
        if publish.page_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "publish.page_extensions cannot be empty".to_owned(),
            ));
        }
        if let Some(ext) = publish
            .page_extensions
            .iter()
            .find(|e| publish.asset_extensions.contains(e))
        {
            return Err(ConfigError::Validation(format!(
                "extension '{ext}' is listed in both publish.page_extensions and publish.asset_extensions"
            )));
        }
        require_non_empty(&publish.root_title, "publish.root_title")?;
        require_non_empty(&publish.state_title, "publish.state_title")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let publish = &mut self.publish;
        let mut fields: Vec<(&mut String, &'static str)> = [
            (&mut publish.output_dir, "publish.output_dir"),
            (&mut publish.title_prefix, "publish.title_prefix"),
            (&mut publish.root_title, "publish.root_title"),
            (&mut publish.state_title, "publish.state_title"),
        ]
        .into_iter()
        .filter_map(|(value, field)| value.as_mut().map(|v| (v, field)))
        .collect();
        if let Some(Toggle::Text(skip)) = &mut publish.skip {
            fields.push((skip, "publish.skip"));
        }
        if let Some(confluence) = &mut self.confluence {
            fields.extend([
                (&mut confluence.base_url, "confluence.base_url"),
                (&mut confluence.space_key, "confluence.space_key"),
                (&mut confluence.ancestor_id, "confluence.ancestor_id"),
                (&mut confluence.access_token, "confluence.access_token"),
                (&mut confluence.access_secret, "confluence.access_secret"),
                (&mut confluence.consumer_key, "confluence.consumer_key"),
            ]);
        }
        expand::expand_all(fields)
    }

    /// Resolve raw values into [`PublishConfig`], with paths relative to the config directory.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let raw = &self.publish;
        let defaults = PublishConfig::with_base(config_dir);
        let skip = match &raw.skip {
            None => defaults.skip,
            Some(Toggle::Bool(value)) => *value,
            Some(Toggle::Text(text)) => parse_toggle(text, "publish.skip")?,
        };

        self.publish_resolved = PublishConfig {
            output_dir: raw
                .output_dir
                .as_deref()
                .map_or(defaults.output_dir, |dir| config_dir.join(dir)),
            index_name: raw.index_name.clone().unwrap_or(defaults.index_name),
            page_extensions: raw
                .page_extensions
                .as_deref()
                .map_or(defaults.page_extensions, normalize_extensions),
            asset_extensions: raw
                .asset_extensions
                .as_deref()
                .map_or(defaults.asset_extensions, normalize_extensions),
            title_prefix: raw.title_prefix.clone().filter(|p| !p.is_empty()),
            root_title: raw.root_title.clone().unwrap_or(defaults.root_title),
            show_banner: raw.show_banner.unwrap_or(defaults.show_banner),
            skip,
            state_title: raw.state_title.clone().unwrap_or(defaults.state_title),
            extract_body: raw.extract_body.unwrap_or(defaults.extract_body),
        };

        Ok(())
    }
}
