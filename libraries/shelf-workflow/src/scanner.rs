//! File scanning for audio files

use crate::{Result, WorkflowError};
use shelf_core::{normalize_extension, parse_extension_list, ShelfError, SUPPORTED_EXTENSIONS};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Normalized set of extensions (lowercase, leading dot)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl ExtensionSet {
    /// Parse a comma/whitespace separated list like `"mp3, .FLAC ogg"`
    pub fn parse(raw: &str) -> std::result::Result<Self, ShelfError> {
        Ok(Self {
            extensions: parse_extension_list(raw)?.into_iter().collect(),
        })
    }

    /// Case-insensitive check against the file's extension
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(normalize_extension)
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(", "))
    }
}

/// Scanner for audio files in a library tree
///
/// Symbolic links are not followed, so directory cycles cannot occur;
/// symlinked files are not reported either.
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    /// Whether to follow symbolic links
    follow_links: bool,

    /// Maximum depth to traverse
    max_depth: Option<usize>,
}

impl FileScanner {
    /// Create a new file scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    ///
    /// walkdir detects loops when following and reports them as entry errors,
    /// which are skipped.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Set maximum directory depth to traverse
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Scan a directory for files whose extension is in `extensions`
    ///
    /// The result is sorted so that planning is reproducible.
    pub fn scan(&self, root: &Path, extensions: &ExtensionSet) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(WorkflowError::LibraryNotFound(root.display().to_string()));
        }

        if !root.is_dir() {
            return Err(WorkflowError::NotADirectory(root.display().to_string()));
        }

        let mut walker = WalkDir::new(root).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && extensions.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Recursively scan `root` with the default scanner settings
pub fn scan_library(root: &Path, extensions: &ExtensionSet) -> Result<Vec<PathBuf>> {
    FileScanner::new().scan(root, extensions)
}
