//! Shared records

use crate::sanitize::{format_track, sanitize_component};
use crate::{UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE, UNKNOWN_TRACK};
use serde::{Deserialize, Serialize};

/// Normalized tags for one source file
///
/// Every field is already sanitized for use as a path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackTags {
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Zero-padded numeral, or the raw value when it has no digits
    pub track: String,
}

impl TrackTags {
    /// Build tags from raw values, sanitizing each field
    pub fn new(
        artist: impl AsRef<str>,
        album: impl AsRef<str>,
        title: impl AsRef<str>,
        track: impl AsRef<str>,
    ) -> Self {
        Self {
            artist: sanitize_component(artist.as_ref(), UNKNOWN_ARTIST),
            album: sanitize_component(album.as_ref(), UNKNOWN_ALBUM),
            title: sanitize_component(title.as_ref(), UNKNOWN_TITLE),
            track: format_track(track.as_ref()),
        }
    }

    /// Tags for a file nothing is known about
    pub fn unknown() -> Self {
        Self {
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            title: UNKNOWN_TITLE.to_string(),
            track: UNKNOWN_TRACK.to_string(),
        }
    }
}

impl Default for TrackTags {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Stream quality used to rank duplicate copies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQuality {
    /// Bits per second
    pub bitrate: Option<u64>,
    /// Samples per second
    pub sample_rate: Option<u32>,
    /// Codec or container name (`flac`, `mp3`, ...)
    pub format_name: Option<String>,
}

impl AudioQuality {
    /// True when no field could be determined
    pub fn is_empty(&self) -> bool {
        self.bitrate.is_none() && self.sample_rate.is_none() && self.format_name.is_none()
    }
}

/// Coarse format ranking used to break bitrate and sample-rate ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatClass {
    Unknown,
    Lossy,
    Standard,
    Lossless,
}

impl FormatClass {
    /// Classify a codec or container name, case-insensitively
    pub fn from_format_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "flac" | "alac" => Self::Lossless,
            "wav" | "aac" | "m4a" | "ogg" | "vorbis" | "opus" => Self::Standard,
            _ if name.starts_with("pcm_") => Self::Standard,
            "mp3" => Self::Lossy,
            _ => Self::Unknown,
        }
    }

    /// Classify an optional format name, `Unknown` when absent
    pub fn from_optional(name: Option<&str>) -> Self {
        name.map_or(Self::Unknown, Self::from_format_name)
    }

    /// Numeric rank, higher is better
    pub fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Lossy => 1,
            Self::Standard => 2,
            Self::Lossless => 3,
        }
    }
}

impl AudioQuality {
    /// Format class of `format_name`, `Unknown` when absent
    pub fn format_class(&self) -> FormatClass {
        FormatClass::from_optional(self.format_name.as_deref())
    }
}
