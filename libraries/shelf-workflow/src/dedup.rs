//! Duplicate detection by content signature
//!
//! Files with the same SHA-256 of their bytes form a group; within a group the
//! copy with the best stream quality is kept. Nothing here touches the files
//! themselves.

use crate::options::DedupOptions;
use crate::scanner::FileScanner;
use crate::Result;
use serde::Serialize;
use shelf_core::{AudioQuality, FormatClass};
use shelf_metadata::{extract_quality, MediaProbe};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Compute the SHA-256 content signature of a file as lowercase hex
pub fn fingerprint(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// One file considered for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioCandidate {
    pub path: PathBuf,
    pub signature: String,
    pub bitrate: Option<u64>,
    pub sample_rate: Option<u32>,
    pub format_name: Option<String>,
    pub size_bytes: u64,
}

impl AudioCandidate {
    /// Ranking key: bitrate, then sample rate, then format class, then size
    ///
    /// Unknown values count as zero.
    pub fn score(&self) -> (u64, u32, u8, u64) {
        (
            self.bitrate.unwrap_or(0),
            self.sample_rate.unwrap_or(0),
            FormatClass::from_optional(self.format_name.as_deref()).rank(),
            self.size_bytes,
        )
    }
}

/// Index of the highest-scoring candidate; the earliest wins ties
pub fn best_index(candidates: &[AudioCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            Some(current) if candidate.score() <= candidates[current].score() => {}
            _ => best = Some(index),
        }
    }
    best
}

/// The candidate to keep
pub fn select_best(candidates: &[AudioCandidate]) -> Option<&AudioCandidate> {
    best_index(candidates).map(|index| &candidates[index])
}

/// Files sharing one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub signature: String,
    /// In scan order
    pub candidates: Vec<AudioCandidate>,
    /// Index into `candidates` of the copy to keep
    pub best: usize,
}

impl DuplicateGroup {
    pub fn best(&self) -> &AudioCandidate {
        &self.candidates[self.best]
    }

    /// Every candidate except the best one
    pub fn discards(&self) -> impl Iterator<Item = &AudioCandidate> {
        self.candidates
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != self.best)
            .map(|(_, candidate)| candidate)
    }
}

/// Duplicate groups found in one library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupPlan {
    pub library_root: PathBuf,
    pub files_scanned: usize,
    pub duplicates: Vec<DuplicateGroup>,
    /// Files whose content could not be read
    pub skipped: Vec<PathBuf>,
}

impl DedupPlan {
    pub fn discard_count(&self) -> usize {
        self.duplicates
            .iter()
            .map(|group| group.candidates.len() - 1)
            .sum()
    }
}

/// Group files by signature, keeping only groups of two or more
///
/// Groups are ordered by their first candidate's path.
pub fn group_duplicates(candidates: Vec<AudioCandidate>) -> Vec<DuplicateGroup> {
    let mut by_signature: BTreeMap<String, Vec<AudioCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_signature
            .entry(candidate.signature.clone())
            .or_default()
            .push(candidate);
    }

    let mut groups: Vec<DuplicateGroup> = by_signature
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .filter_map(|(signature, members)| {
            let best = best_index(&members)?;
            Some(DuplicateGroup {
                signature,
                candidates: members,
                best,
            })
        })
        .collect();

    groups.sort_by(|a, b| a.candidates[0].path.cmp(&b.candidates[0].path));
    groups
}

fn candidate_for(
    path: &Path,
    quality: AudioQuality,
    signature: String,
) -> io::Result<AudioCandidate> {
    let size_bytes = path.metadata()?.len();
    Ok(AudioCandidate {
        path: path.to_path_buf(),
        signature,
        bitrate: quality.bitrate,
        sample_rate: quality.sample_rate,
        format_name: quality.format_name,
        size_bytes,
    })
}

/// Scan a library and find its duplicate groups
pub fn plan_dedup(options: &DedupOptions, probe: &dyn MediaProbe) -> Result<DedupPlan> {
    let files = FileScanner::new().scan(&options.library_path, &options.extensions)?;
    let prefer_probe = options.use_ffprobe.resolve(probe);

    let mut candidates = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in &files {
        let candidate = fingerprint(path).and_then(|signature| {
            let quality = extract_quality(probe, path, prefer_probe);
            candidate_for(path, quality, signature)
        });

        match candidate {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                tracing::warn!("Skipping unreadable file {}: {}", path.display(), e);
                skipped.push(path.clone());
            }
        }
    }

    let duplicates = group_duplicates(candidates);
    tracing::info!(
        "Found {} duplicate groups among {} files in {}",
        duplicates.len(),
        files.len(),
        options.library_path.display()
    );

    Ok(DedupPlan {
        library_root: options.library_path.clone(),
        files_scanned: files.len(),
        duplicates,
        skipped,
    })
}
