//! Stream quality lookup for duplicate ranking

use crate::embedded::{extension_format, read_embedded_quality};
use crate::probe::MediaProbe;
use shelf_core::AudioQuality;
use std::path::Path;

/// Determine bitrate, sample rate, and format for a file
///
/// The probe is asked first when preferred; any field it reports wins.
/// Otherwise the decoding library's properties are used, and finally only the
/// extension is known. Fields stay `None` when nothing can determine them.
pub fn extract_quality(probe: &dyn MediaProbe, path: &Path, prefer_probe: bool) -> AudioQuality {
    if prefer_probe {
        if let Some(quality) = probe.probe_quality(path).filter(|q| !q.is_empty()) {
            return quality;
        }
    }

    match read_embedded_quality(path) {
        Ok(quality) => quality,
        Err(e) => {
            tracing::debug!("Falling back to extension for {}: {}", path.display(), e);
            AudioQuality {
                format_name: extension_format(path),
                ..AudioQuality::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{NoProbe, RawTags};

    struct FixedProbe(AudioQuality);

    impl MediaProbe for FixedProbe {
        fn is_available(&self) -> bool {
            true
        }

        fn probe_tags(&self, _path: &Path) -> Option<RawTags> {
            None
        }

        fn probe_quality(&self, _path: &Path) -> Option<AudioQuality> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn probe_result_wins_when_preferred() {
        let probe = FixedProbe(AudioQuality {
            bitrate: Some(320_000),
            sample_rate: Some(44_100),
            format_name: Some("mp3".to_string()),
        });

        let quality = extract_quality(&probe, Path::new("/nonexistent/a.flac"), true);
        assert_eq!(quality.bitrate, Some(320_000));
        assert_eq!(quality.format_name.as_deref(), Some("mp3"));
    }

    #[test]
    fn probe_ignored_when_not_preferred() {
        let probe = FixedProbe(AudioQuality {
            bitrate: Some(320_000),
            ..AudioQuality::default()
        });

        let quality = extract_quality(&probe, Path::new("/nonexistent/a.flac"), false);
        assert_eq!(quality.bitrate, None);
        assert_eq!(quality.format_name.as_deref(), Some("flac"));
    }

    #[test]
    fn unreadable_file_keeps_extension_only() {
        let quality = extract_quality(&NoProbe, Path::new("/nonexistent/a.OGG"), true);
        assert_eq!(
            quality,
            AudioQuality {
                bitrate: None,
                sample_rate: None,
                format_name: Some("ogg".to_string()),
            }
        );
    }
}
