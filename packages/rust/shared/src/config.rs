//! Application configuration for Nobestudy.
//!
//! User config lives at `~/.nobestudy/nobestudy.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NobestudyError, Result};
use crate::types::Source;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "nobestudy.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".nobestudy";

/// Directory under the system temp dir used when no output dir is configured.
const DEFAULT_EXPORT_DIR: &str = "nobestudy-exports";

// ---------------------------------------------------------------------------
// Config structs (matching nobestudy.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Export behaviour.
    #[serde(default)]
    pub export: ExportConfig,

    /// Source catalogue.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root for per-request export directories. Unset means the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Query type used when the caller does not give one.
    #[serde(default = "default_query_type")]
    pub query_type: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            query_type: default_query_type(),
        }
    }
}

impl DefaultsConfig {
    /// Resolve the export root directory.
    pub fn output_root(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join(DEFAULT_EXPORT_DIR),
        }
    }
}

fn default_query_type() -> String {
    "description".into()
}

/// `[http]` section. These settings belong to the transport; the retrieval
/// pipeline itself defines no timeout or retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("Nobestudy/", env!("CARGO_PKG_VERSION")).into()
}
fn default_max_redirects() -> usize {
    5
}

/// What the caller does when a renderer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and report a degraded outcome.
    Degrade,
    /// Return the failure to the caller.
    Propagate,
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Failure policy for the PDF renderer.
    #[serde(default = "default_pdf_failure")]
    pub pdf_failure: FailurePolicy,

    /// Failure policy for the slide deck and word document renderers.
    #[serde(default = "default_document_failure")]
    pub document_failure: FailurePolicy,

    /// Keep per-request export directories after delivery.
    #[serde(default)]
    pub keep_outputs: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pdf_failure: default_pdf_failure(),
            document_failure: default_document_failure(),
            keep_outputs: false,
        }
    }
}

fn default_pdf_failure() -> FailurePolicy {
    FailurePolicy::Degrade
}
fn default_document_failure() -> FailurePolicy {
    FailurePolicy::Propagate
}

/// `[sources]` section: one prioritized source, then ordered fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_prioritized")]
    pub prioritized: Source,

    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<Source>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            prioritized: default_prioritized(),
            fallbacks: default_fallbacks(),
        }
    }
}

fn default_prioritized() -> Source {
    Source::new(
        "wikipedia",
        "https://en.wikipedia.org/wiki/{query}",
        "#mw-content-text",
    )
}

fn default_fallbacks() -> Vec<Source> {
    vec![
        Source::new(
            "simple-wikipedia",
            "https://simple.wikipedia.org/wiki/{query}",
            "#mw-content-text",
        ),
        Source::new(
            "britannica",
            "https://www.britannica.com/topic/{query}",
            ".topic-content",
        )
        .with_word_separator("-"),
        Source::new(
            "new-world-encyclopedia",
            "https://www.newworldencyclopedia.org/entry/{query}",
            "#mw-content-text",
        ),
        Source::new(
            "wiktionary",
            "https://en.wiktionary.org/wiki/{query}",
            "#mw-content-text",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.nobestudy/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NobestudyError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.nobestudy/nobestudy.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NobestudyError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NobestudyError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_sources(&config.sources)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NobestudyError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NobestudyError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NobestudyError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that every source template carries the `{query}` placeholder.
pub fn validate_sources(sources: &SourcesConfig) -> Result<()> {
    for source in std::iter::once(&sources.prioritized).chain(&sources.fallbacks) {
        if !source.url_template.contains("{query}") {
            return Err(NobestudyError::config(format!(
                "source '{}': url_template must contain {{query}}",
                source.name
            )));
        }
        if source.container.trim().is_empty() {
            return Err(NobestudyError::config(format!(
                "source '{}': container selector is empty",
                source.name
            )));
        }
    }
    Ok(())
}
