/// External probe tool wrapper (ffprobe)
use crate::error::{MetadataError, Result};
use serde_json::Value;
use shelf_core::AudioQuality;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Raw tag values reported for a file, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track: Option<String>,
}

impl RawTags {
    /// True when artist, album, or title carries text
    pub fn is_usable(&self) -> bool {
        [&self.artist, &self.album, &self.title]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Read-only metadata probe
///
/// Failures are reported as `None`; callers degrade to other sources.
pub trait MediaProbe {
    /// Whether the probe can be run on this host
    fn is_available(&self) -> bool;

    /// Embedded container tags
    fn probe_tags(&self, path: &Path) -> Option<RawTags>;

    /// Bitrate, sample rate, and codec of the first audio stream
    fn probe_quality(&self, path: &Path) -> Option<AudioQuality>;
}

/// Probe that never reports anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl MediaProbe for NoProbe {
    fn is_available(&self) -> bool {
        false
    }

    fn probe_tags(&self, _path: &Path) -> Option<RawTags> {
        None
    }

    fn probe_quality(&self, _path: &Path) -> Option<AudioQuality> {
        None
    }
}

/// ffprobe invoked as one blocking subprocess per call
#[derive(Debug)]
pub struct FfprobeTool {
    binary: PathBuf,
    available: OnceLock<bool>,
}

impl Default for FfprobeTool {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            available: OnceLock::new(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run ffprobe with JSON output and parse stdout
    fn run_json(&self, args: &[&str], path: &Path) -> Result<Value> {
        let output = Command::new(&self.binary)
            .args(["-v", "error"])
            .args(args)
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetadataError::Probe(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl MediaProbe for FfprobeTool {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            Command::new(&self.binary)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    fn probe_tags(&self, path: &Path) -> Option<RawTags> {
        match self.run_json(&["-show_entries", "format_tags:stream_tags"], path) {
            Ok(payload) => Some(parse_tags(&payload)),
            Err(e) => {
                tracing::debug!("Tag probe failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    fn probe_quality(&self, path: &Path) -> Option<AudioQuality> {
        let args = [
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=bit_rate,sample_rate,codec_name:format=bit_rate",
        ];
        match self.run_json(&args, path) {
            Ok(payload) => Some(parse_quality(&payload)),
            Err(e) => {
                tracing::debug!("Quality probe failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Extract tags from ffprobe JSON
///
/// Format-level tags win over stream-level tags; keys match case-insensitively.
pub fn parse_tags(payload: &Value) -> RawTags {
    let mut tags = RawTags::default();

    let format_tags = payload.pointer("/format/tags");
    let stream_tags = payload
        .get("streams")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|stream| stream.get("tags"));

    for source in format_tags.into_iter().chain(stream_tags) {
        let Some(map) = source.as_object() else {
            continue;
        };
        for (key, value) in map {
            let Some(text) = value.as_str().map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            let slot = match key.to_lowercase().as_str() {
                "artist" => &mut tags.artist,
                "album" => &mut tags.album,
                "title" => &mut tags.title,
                "track" => &mut tags.track,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
        }
    }

    tags
}

/// Extract stream quality from ffprobe JSON
///
/// Numeric fields arrive as strings; the container bitrate stands in when the
/// stream has none (common for FLAC).
pub fn parse_quality(payload: &Value) -> AudioQuality {
    let stream = payload
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| streams.first());

    let number = |value: Option<&Value>| -> Option<u64> {
        match value? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    };

    let bitrate = number(stream.and_then(|s| s.get("bit_rate")))
        .or_else(|| number(payload.pointer("/format/bit_rate")));
    let sample_rate = number(stream.and_then(|s| s.get("sample_rate")))
        .and_then(|rate| u32::try_from(rate).ok());
    let format_name = stream
        .and_then(|s| s.get("codec_name"))
        .and_then(Value::as_str)
        .map(|name| name.to_lowercase());

    AudioQuality {
        bitrate,
        sample_rate,
        format_name,
    }
}
