//! Shelf Metadata
//!
//! Tag and stream-quality extraction for library workflows.
//!
//! This crate provides:
//! - A probe abstraction (`MediaProbe`) with an ffprobe implementation
//! - Embedded tag reading through lofty
//! - The tag extractor: probe, then embedded tags, then filename parsing
//! - Quality extraction used to rank duplicate copies
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_metadata::{FfprobeTool, MediaProbe, TagExtractor};
//! use std::path::Path;
//!
//! let probe = FfprobeTool::default();
//! let extractor = TagExtractor::new(&probe);
//! let tags = extractor.extract(Path::new("/music/track01.mp3"), probe.is_available());
//! println!("{} - {}", tags.artist, tags.title);
//! ```

mod embedded;
mod error;
mod probe;
mod quality;
mod tags;

pub use embedded::{extension_format, read_embedded_quality, read_embedded_tags};
pub use error::{MetadataError, Result};
pub use probe::{parse_quality, parse_tags, FfprobeTool, MediaProbe, NoProbe, RawTags};
pub use quality::extract_quality;
pub use tags::{
    extract_tags, parse_filename, FolderHints, HintLayout, TagExtractor, FILENAME_SEPARATOR,
};
