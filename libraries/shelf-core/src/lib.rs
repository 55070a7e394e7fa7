//! Shelf Core
//!
//! Platform-agnostic records shared by the shelf crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackTags`, `AudioQuality`, `FormatClass`
//! - **Sanitizing**: filesystem-safe path components with "Unknown ..." fallbacks
//! - **Extensions**: the default audio extension set and its normalization
//!
//! # Example
//!
//! ```rust
//! use shelf_core::TrackTags;
//!
//! let tags = TrackTags::new("Muse", "Origin of Symmetry", "New Born", "1");
//! assert_eq!(tags.track, "01");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{Result, ShelfError};
pub use sanitize::{format_track, sanitize_component};
pub use types::{AudioQuality, FormatClass, TrackTags};

/// Sentinel for a missing artist
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Sentinel for a missing album
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Sentinel for a missing title
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Track number used when none can be determined
pub const UNKNOWN_TRACK: &str = "00";

/// Audio extensions scanned when no extension list is given
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &[".aac", ".alac", ".flac", ".m4a", ".mp3", ".ogg", ".wav"];

/// Normalize an extension to lowercase with a leading dot
///
/// Returns `None` for empty input.
pub fn normalize_extension(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_start_matches('.').to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed))
    }
}

/// Parse a comma or whitespace separated extension list
///
/// Entries are normalized with [`normalize_extension`] and deduplicated while
/// keeping their first-seen order.
pub fn parse_extension_list(raw: &str) -> Result<Vec<String>> {
    let mut extensions: Vec<String> = Vec::new();
    for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let Some(extension) = normalize_extension(token) else {
            continue;
        };
        if extension[1..].contains(|c: char| matches!(c, '.' | '/' | '\\') || c.is_control()) {
            return Err(ShelfError::InvalidExtension(token.trim().to_string()));
        }
        if !extensions.contains(&extension) {
            extensions.push(extension);
        }
    }

    if extensions.is_empty() {
        return Err(ShelfError::EmptyExtensionList);
    }
    Ok(extensions)
}
