//! Destination collision resolution
//!
//! A destination is taken when it exists on disk or was already handed out
//! to another file in the same plan. Taken names get a ` (N)` suffix before
//! the extension, starting at 1.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Destinations already handed out within one plan
#[derive(Debug, Clone, Default)]
pub struct ClaimedSet {
    paths: HashSet<PathBuf>,
}

impl ClaimedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as taken. Returns false if it was already claimed.
    pub fn claim(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Find a free path for `dest`
///
/// Returns the chosen path and whether it differs from `dest`. The caller is
/// expected to claim the result.
pub fn resolve(dest: &Path, claimed: &ClaimedSet) -> (PathBuf, bool) {
    resolve_for(None, dest, claimed)
}

/// Like [`resolve`], but `source` itself does not count as taken
///
/// A file that already sits at its desired location must not be pushed to
/// `name (1)` just because it exists.
pub fn resolve_for(source: Option<&Path>, dest: &Path, claimed: &ClaimedSet) -> (PathBuf, bool) {
    if is_free(source, dest, claimed) {
        return (dest.to_path_buf(), false);
    }

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u64 = 1;
    loop {
        let candidate = dest.with_file_name(format!("{} ({}){}", stem, counter, extension));
        if is_free(source, &candidate, claimed) {
            return (candidate, true);
        }
        counter += 1;
    }
}

fn is_free(source: Option<&Path>, candidate: &Path, claimed: &ClaimedSet) -> bool {
    if claimed.contains(candidate) {
        return false;
    }
    if source == Some(candidate) {
        return true;
    }
    // symlink_metadata so dangling links still count as occupied
    candidate.symlink_metadata().is_err()
}
