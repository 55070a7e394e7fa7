//! Options bundles for each workflow
//!
//! Options arrive as a flat string map. Each workflow parses the map into a
//! typed struct, collecting every problem before returning.

use crate::error::ValidationErrors;
use crate::path_template::{PathTemplate, DEFAULT_TEMPLATE};
use crate::scanner::ExtensionSet;
use crate::Result;
use serde::Serialize;
use shelf_metadata::MediaProbe;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, PathBuf};
use std::str::FromStr;

/// Flat key/value options as supplied by the caller
pub type RawOptions = BTreeMap<String, String>;

/// Default registry location relative to the library root
pub const DEFAULT_DB_RELATIVE: &str = ".library_dedup/signatures.json";

/// One recognized option key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDefinition {
    pub key: &'static str,
    pub label: &'static str,
    /// Shown to the user; empty when the option has no fixed default
    pub default: String,
}

impl OptionDefinition {
    fn new(key: &'static str, label: &'static str, default: impl Into<String>) -> Self {
        Self {
            key,
            label,
            default: default.into(),
        }
    }
}

fn default_extensions_label() -> String {
    ExtensionSet::default().to_string()
}

fn default_music_dir() -> String {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .map(|dir| dir.display().to_string())
        .unwrap_or_default()
}

/// Whether to ask the external probe for tags and quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbePreference {
    /// Use the probe when it can be run
    #[default]
    Auto,
    Always,
    Never,
}

impl ProbePreference {
    /// Decide for this run
    ///
    /// `Always` still degrades to the fallbacks per file when the probe
    /// fails, so it is only honored when the probe is runnable.
    pub fn resolve(self, probe: &dyn MediaProbe) -> bool {
        match self {
            Self::Never => false,
            Self::Auto | Self::Always => probe.is_available(),
        }
    }
}

impl FromStr for ProbePreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "true" => Ok(Self::Always),
            "false" => Ok(Self::Never),
            other => Err(format!("expected auto, true, or false, got '{}'", other)),
        }
    }
}

impl fmt::Display for ProbePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Always => "true",
            Self::Never => "false",
        })
    }
}

/// Expand `~` and make a path absolute
///
/// `.` and `..` components are folded lexically; symlinks are left alone.
pub fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Looks up keys and records problems against them
struct OptionReader<'a> {
    raw: &'a RawOptions,
    errors: ValidationErrors,
}

impl<'a> OptionReader<'a> {
    fn new(raw: &'a RawOptions) -> Self {
        Self {
            raw,
            errors: ValidationErrors::new(),
        }
    }

    /// Value for `key`, `None` when absent or blank
    fn value(&self, key: &str) -> Option<&'a str> {
        self.raw
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// A path that must name an existing directory
    fn existing_dir(&mut self, key: &str, label: &str) -> Option<PathBuf> {
        let Some(raw) = self.value(key) else {
            self.errors.push(key, format!("{} is required.", label));
            return None;
        };

        let path = expand_path(raw);
        if !path.exists() {
            self.errors
                .push(key, format!("{} does not exist: {}", label, path.display()));
            return None;
        }
        if !path.is_dir() {
            self.errors
                .push(key, format!("{} is not a directory: {}", label, path.display()));
            return None;
        }
        Some(path)
    }

    /// An optional path that may not exist yet, but must be a directory if it does
    fn optional_dir(&mut self, key: &str, label: &str) -> Option<PathBuf> {
        let path = expand_path(self.value(key)?);
        if path.exists() && !path.is_dir() {
            self.errors
                .push(key, format!("{} is not a directory: {}", label, path.display()));
        }
        Some(path)
    }

    fn extensions(&mut self) -> ExtensionSet {
        let raw = self.raw;
        match raw.get("extensions") {
            None => ExtensionSet::default(),
            Some(raw) => ExtensionSet::parse(raw).unwrap_or_else(|e| {
                self.errors.push("extensions", format!("{}.", e));
                ExtensionSet::default()
            }),
        }
    }

    fn probe_preference(&mut self) -> ProbePreference {
        let raw = self.raw;
        raw.get("use_ffprobe")
            .map_or(Ok(ProbePreference::Auto), |raw| raw.parse())
            .unwrap_or_else(|e| {
                self.errors.push("use_ffprobe", e);
                ProbePreference::Auto
            })
    }

    fn template(&mut self) -> PathTemplate {
        let raw = self.raw;
        let template = raw.get("template").map_or(DEFAULT_TEMPLATE, String::as_str);
        PathTemplate::parse(template).unwrap_or_else(|e| {
            self.errors.push("template", e.to_string());
            PathTemplate::default()
        })
    }

    fn finish<T>(self, value: T) -> Result<T> {
        self.errors.into_result(value)
    }
}

/// Options for reorganizing a library by tags
#[derive(Debug, Clone, PartialEq)]
pub struct CleanerOptions {
    pub library_path: PathBuf,
    /// Where organized files land; the library itself unless given
    pub destination_root: PathBuf,
    pub template: PathTemplate,
    pub extensions: ExtensionSet,
    pub use_ffprobe: ProbePreference,
}

impl CleanerOptions {
    pub fn definitions() -> Vec<OptionDefinition> {
        vec![
            OptionDefinition::new("library_path", "Library path", default_music_dir()),
            OptionDefinition::new(
                "destination_root",
                "Destination root (defaults to library path)",
                "",
            ),
            OptionDefinition::new("template", "Destination template", DEFAULT_TEMPLATE),
            OptionDefinition::new("extensions", "Extensions", default_extensions_label()),
            OptionDefinition::new("use_ffprobe", "Use ffprobe (auto/true/false)", "auto"),
        ]
    }

    pub fn from_raw(raw: &RawOptions) -> Result<Self> {
        let mut reader = OptionReader::new(raw);
        let library_path = reader.existing_dir("library_path", "Library path");
        let destination_root = reader.optional_dir("destination_root", "Destination root");
        let template = reader.template();
        let extensions = reader.extensions();
        let use_ffprobe = reader.probe_preference();

        let Some(library_path) = library_path else {
            return Err(crate::WorkflowError::Validation(reader.errors));
        };
        let destination_root = destination_root.unwrap_or_else(|| library_path.clone());

        reader.finish(Self {
            library_path,
            destination_root,
            template,
            extensions,
            use_ffprobe,
        })
    }

    /// Effective values, recorded in the apply log
    pub fn resolved(&self) -> RawOptions {
        BTreeMap::from([
            ("library_path".to_string(), self.library_path.display().to_string()),
            ("destination_root".to_string(), self.destination_root.display().to_string()),
            ("template".to_string(), self.template.to_string()),
            ("extensions".to_string(), self.extensions.to_string()),
            ("use_ffprobe".to_string(), self.use_ffprobe.to_string()),
        ])
    }
}

/// Options for moving one library into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub source_library_path: PathBuf,
    pub destination_library_path: PathBuf,
    pub extensions: ExtensionSet,
}

impl MergeOptions {
    pub fn definitions() -> Vec<OptionDefinition> {
        let music = default_music_dir();
        vec![
            OptionDefinition::new("source_library_path", "Source library path", music.clone()),
            OptionDefinition::new("destination_library_path", "Destination library path", music),
            OptionDefinition::new("extensions", "Extensions", default_extensions_label()),
        ]
    }

    pub fn from_raw(raw: &RawOptions) -> Result<Self> {
        let mut reader = OptionReader::new(raw);
        let source = reader.existing_dir("source_library_path", "Source library path");
        let destination =
            reader.existing_dir("destination_library_path", "Destination library path");
        let extensions = reader.extensions();

        let (Some(source_library_path), Some(destination_library_path)) = (source, destination)
        else {
            return Err(crate::WorkflowError::Validation(reader.errors));
        };

        if source_library_path == destination_library_path {
            reader.errors.push(
                "destination_library_path",
                "Destination library must differ from the source library.",
            );
        } else if destination_library_path.starts_with(&source_library_path)
            || source_library_path.starts_with(&destination_library_path)
        {
            reader.errors.push(
                "destination_library_path",
                "Source and destination libraries must not be nested inside each other.",
            );
        }

        reader.finish(Self {
            source_library_path,
            destination_library_path,
            extensions,
        })
    }

    pub fn resolved(&self) -> RawOptions {
        BTreeMap::from([
            (
                "source_library_path".to_string(),
                self.source_library_path.display().to_string(),
            ),
            (
                "destination_library_path".to_string(),
                self.destination_library_path.display().to_string(),
            ),
            ("extensions".to_string(), self.extensions.to_string()),
        ])
    }
}

/// Options for finding duplicate copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOptions {
    pub library_path: PathBuf,
    pub extensions: ExtensionSet,
    pub use_ffprobe: ProbePreference,
    /// Signature registry document
    pub db_path: PathBuf,
}

impl DedupOptions {
    pub fn definitions() -> Vec<OptionDefinition> {
        vec![
            OptionDefinition::new("library_path", "Library path", default_music_dir()),
            OptionDefinition::new("extensions", "Extensions", default_extensions_label()),
            OptionDefinition::new("use_ffprobe", "Use ffprobe (auto/true/false)", "auto"),
            OptionDefinition::new(
                "db_path",
                "Signature database path",
                format!("<library>/{}", DEFAULT_DB_RELATIVE),
            ),
        ]
    }

    pub fn from_raw(raw: &RawOptions) -> Result<Self> {
        let mut reader = OptionReader::new(raw);
        let library_path = reader.existing_dir("library_path", "Library path");
        let extensions = reader.extensions();
        let use_ffprobe = reader.probe_preference();
        let db_path = reader.value("db_path").map(expand_path);

        if let Some(db_path) = &db_path {
            if db_path.is_dir() {
                reader.errors.push(
                    "db_path",
                    format!("Database path is a directory: {}", db_path.display()),
                );
            }
        }

        let Some(library_path) = library_path else {
            return Err(crate::WorkflowError::Validation(reader.errors));
        };
        let db_path = db_path.unwrap_or_else(|| library_path.join(DEFAULT_DB_RELATIVE));

        reader.finish(Self {
            library_path,
            extensions,
            use_ffprobe,
            db_path,
        })
    }

    pub fn resolved(&self) -> RawOptions {
        BTreeMap::from([
            ("library_path".to_string(), self.library_path.display().to_string()),
            ("extensions".to_string(), self.extensions.to_string()),
            ("use_ffprobe".to_string(), self.use_ffprobe.to_string()),
            ("db_path".to_string(), self.db_path.display().to_string()),
        ])
    }
}
