//! Tag extraction with probe, embedded-tag, and filename fallbacks
//!
//! Sources are tried in order:
//!
//! 1. The external probe, when preferred and runnable
//! 2. Embedded tags read in-process (lofty)
//! 3. The filename split on `" - "`, plus folder hints below the library root
//!
//! Nothing here returns an error: an unreadable file simply ends up with
//! filename-derived tags.

use crate::embedded::read_embedded_tags;
use crate::probe::{MediaProbe, RawTags};
use shelf_core::{TrackTags, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use std::path::Path;

/// Separator between tokens in a filename like `Artist - Album - 01 - Title`
pub const FILENAME_SEPARATOR: &str = " - ";

/// Artist/album guesses taken from the directories containing a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderHints {
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// Which directory levels below a library root name the artist and album
///
/// Levels count from the root, starting at zero. The default matches the
/// `Artist/Album/file` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintLayout {
    /// Number of directories between the root and an organized file
    pub depth: usize,
    pub artist: Option<usize>,
    pub album: Option<usize>,
}

impl Default for HintLayout {
    fn default() -> Self {
        Self {
            depth: 2,
            artist: Some(0),
            album: Some(1),
        }
    }
}

impl FolderHints {
    /// Hints for `path` relative to `root`
    ///
    /// Only directories strictly inside `root` count, and only when the file
    /// is at least two levels deep (`root/Artist/Album/file`).
    pub fn from_library_path(root: &Path, path: &Path) -> Self {
        relative_dirs(root, path)
            .map(|dirs| Self::from_innermost(&dirs))
            .unwrap_or_default()
    }

    /// Hints for `path` read through a known layout
    ///
    /// A file exactly `layout.depth` directories below `root` takes its hints
    /// from the layout's levels, with no hint for a level the layout lacks.
    /// Any other depth falls back to [`FolderHints::from_library_path`].
    pub fn from_layout(root: &Path, path: &Path, layout: &HintLayout) -> Self {
        let Some(dirs) = relative_dirs(root, path) else {
            return Self::default();
        };

        if dirs.len() != layout.depth {
            return Self::from_innermost(&dirs);
        }

        Self {
            artist: layout.artist.and_then(|level| dirs.get(level).cloned()),
            album: layout.album.and_then(|level| dirs.get(level).cloned()),
        }
    }

    fn from_innermost(dirs: &[String]) -> Self {
        if dirs.len() < 2 {
            return Self::default();
        }

        Self {
            artist: dirs.get(dirs.len() - 2).cloned(),
            album: dirs.last().cloned(),
        }
    }
}

/// Directory names between `root` and the file, `None` outside `root`
fn relative_dirs(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;

    Some(
        relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default(),
    )
}

/// Tag extractor over an injected probe
pub struct TagExtractor<'a> {
    probe: &'a dyn MediaProbe,
    read_embedded: bool,
}

impl<'a> TagExtractor<'a> {
    pub fn new(probe: &'a dyn MediaProbe) -> Self {
        Self {
            probe,
            read_embedded: true,
        }
    }

    /// Set whether to read embedded tags in-process before the filename fallback
    pub fn with_embedded_tags(mut self, read_embedded: bool) -> Self {
        self.read_embedded = read_embedded;
        self
    }

    /// Extract tags for a file with no library context
    pub fn extract(&self, path: &Path, prefer_probe: bool) -> TrackTags {
        self.extract_with_hints(path, &FolderHints::default(), prefer_probe)
    }

    /// Extract tags for a file inside a library root
    pub fn extract_in_library(&self, root: &Path, path: &Path, prefer_probe: bool) -> TrackTags {
        let hints = FolderHints::from_library_path(root, path);
        self.extract_with_hints(path, &hints, prefer_probe)
    }

    /// Extract tags for a file organized under `root` by `layout`
    pub fn extract_in_layout(
        &self,
        root: &Path,
        path: &Path,
        layout: &HintLayout,
        prefer_probe: bool,
    ) -> TrackTags {
        let hints = FolderHints::from_layout(root, path, layout);
        self.extract_with_hints(path, &hints, prefer_probe)
    }

    fn extract_with_hints(
        &self,
        path: &Path,
        hints: &FolderHints,
        prefer_probe: bool,
    ) -> TrackTags {
        if prefer_probe {
            if let Some(raw) = self.probe.probe_tags(path).filter(RawTags::is_usable) {
                return normalize(&raw);
            }
            tracing::debug!("No usable probe tags for {}", path.display());
        }

        if self.read_embedded {
            match read_embedded_tags(path) {
                Ok(raw) if raw.is_usable() => return normalize(&raw),
                Ok(_) => {}
                Err(e) => tracing::debug!("No embedded tags for {}: {}", path.display(), e),
            }
        }

        parse_filename(path, hints)
    }
}

/// Extract tags using ffprobe from `PATH` when preferred
pub fn extract_tags(path: &Path, prefer_probe: bool) -> TrackTags {
    let probe = crate::probe::FfprobeTool::default();
    TagExtractor::new(&probe).extract(path, prefer_probe)
}

fn normalize(raw: &RawTags) -> TrackTags {
    TrackTags::new(
        raw.artist.as_deref().unwrap_or(""),
        raw.album.as_deref().unwrap_or(""),
        raw.title.as_deref().unwrap_or(""),
        raw.track.as_deref().unwrap_or(""),
    )
}

/// Parse tags from a filename
///
/// Token layout after splitting the stem on `" - "`:
///
/// | Tokens | Meaning |
/// |--------|---------|
/// | 1 | title |
/// | 2+ with an all-digit first token | track, title (the rest rejoined) |
/// | 2 | artist, title |
/// | 3 | artist, track, title if the middle is all digits; else artist, album, title |
/// | 4+ | artist, album, track, title (the rest rejoined) |
///
/// A leading number always means "track": `03 - Hysteria - Live` is track 3 of
/// a title that itself contains the separator, which is how rendered
/// `{track} - {title}` names read back.
///
/// Anything the filename leaves open comes from `hints`, then the sentinels.
pub fn parse_filename(path: &Path, hints: &FolderHints) -> TrackTags {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tokens: Vec<&str> = stem.split(FILENAME_SEPARATOR).map(str::trim).collect();

    let mut artist: Option<&str> = None;
    let mut album: Option<&str> = None;
    let mut track: Option<&str> = None;
    let title: String;

    match tokens.as_slice() {
        [] => title = String::new(),
        [only] => title = (*only).to_string(),
        [first, rest @ ..] if is_all_digits(first) => {
            track = Some(*first);
            title = rest.join(FILENAME_SEPARATOR);
        }
        [first, second] => {
            artist = Some(*first);
            title = (*second).to_string();
        }
        [first, middle, last] => {
            artist = Some(*first);
            if is_all_digits(middle) {
                track = Some(*middle);
            } else {
                album = Some(*middle);
            }
            title = (*last).to_string();
        }
        [first, second, third, rest @ ..] => {
            artist = Some(*first);
            album = Some(*second);
            track = Some(*third);
            title = rest.join(FILENAME_SEPARATOR);
        }
    }

    TrackTags::new(
        artist.or(hints.artist.as_deref()).unwrap_or(UNKNOWN_ARTIST),
        album.or(hints.album.as_deref()).unwrap_or(UNKNOWN_ALBUM),
        if title.is_empty() { UNKNOWN_TITLE } else { title.as_str() },
        track.unwrap_or(""),
    )
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
