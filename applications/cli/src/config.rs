//! CLI configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shelf_workflow::{PathTemplate, DEFAULT_PREVIEW_LIMIT, DEFAULT_TEMPLATE};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "shelf.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShelfConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,

    /// Tracing filter directive; `RUST_LOG` wins when set
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default = "default_template")]
    pub default_template: String,
}

impl ShelfConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit path must exist; the default `shelf.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                settings.add_source(config::File::from(path).format(config::FileFormat::Toml))
            }
            None => settings.add_source(
                config::File::with_name(DEFAULT_CONFIG_FILE)
                    .format(config::FileFormat::Toml)
                    .required(false),
            ),
        };

        // Override with environment variables (prefixed with SHELF_)
        settings = settings.add_source(
            config::Environment::with_prefix("SHELF")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = settings.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.preview_limit == 0 {
            bail!("preview_limit must be at least 1");
        }

        if self.default_template.trim().is_empty() {
            bail!("default_template must not be empty");
        }
        self.default_template
            .parse::<PathTemplate>()
            .context("default_template is not a valid template")?;

        Ok(())
    }
}

// Default values
fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            preview_limit: default_preview_limit(),
            log_level: None,
            default_template: default_template(),
        }
    }
}
