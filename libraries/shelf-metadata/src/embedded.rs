/// In-process tag reading using lofty
use crate::error::{MetadataError, Result};
use crate::probe::RawTags;
use lofty::{Accessor, AudioFile, TaggedFileExt};
use shelf_core::AudioQuality;
use std::path::Path;

/// Read embedded tags without spawning a process
pub fn read_embedded_tags(path: &Path) -> Result<RawTags> {
    if !path.exists() {
        return Err(MetadataError::FileNotFound(path.display().to_string()));
    }

    let tagged_file = lofty::read_from_path(path)?;

    // Get primary tag (prefer ID3v2 for MP3, Vorbis for OGG/FLAC)
    let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) else {
        return Ok(RawTags::default());
    };

    Ok(RawTags {
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        title: tag.title().map(|s| s.to_string()),
        track: tag.track().map(|t| t.to_string()),
    })
}

/// Read stream properties as decoded by lofty
///
/// Bitrate is converted from kbps to bps so it ranks against probe output.
pub fn read_embedded_quality(path: &Path) -> Result<AudioQuality> {
    if !path.exists() {
        return Err(MetadataError::FileNotFound(path.display().to_string()));
    }

    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    Ok(AudioQuality {
        bitrate: properties.audio_bitrate().map(|kbps| u64::from(kbps) * 1000),
        sample_rate: properties.sample_rate(),
        format_name: extension_format(path),
    })
}

/// Lowercase file extension, used as the format name of last resort
pub fn extension_format(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}
