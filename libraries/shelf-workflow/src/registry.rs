//! Signature registry for dedup results
//!
//! Dedup never deletes anything; it records which copies share a signature
//! and which one should be kept, for other tools to act on.

use crate::dedup::AudioCandidate;
use crate::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Stored decision for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub path: PathBuf,
    pub signature: String,
    pub library_root: PathBuf,
    pub bitrate: Option<u64>,
    pub sample_rate: Option<u32>,
    pub format_name: Option<String>,
    /// Best copy of its group
    pub kept: bool,
    pub recorded_at: DateTime<Utc>,
}

impl SignatureRecord {
    pub fn from_candidate(candidate: &AudioCandidate, library_root: &Path, kept: bool) -> Self {
        Self {
            path: candidate.path.clone(),
            signature: candidate.signature.clone(),
            library_root: library_root.to_path_buf(),
            bitrate: candidate.bitrate,
            sample_rate: candidate.sample_rate,
            format_name: candidate.format_name.clone(),
            kept,
            recorded_at: Utc::now(),
        }
    }
}

/// Sink for dedup decisions
pub trait SignatureRegistry {
    /// Insert or replace the record for `record.path`
    fn record(&mut self, record: SignatureRecord) -> Result<()>;

    /// Persist everything recorded so far
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    records: BTreeMap<String, SignatureRecord>,
}

/// Registry stored as one JSON document keyed by file path
#[derive(Debug)]
pub struct JsonSignatureRegistry {
    path: PathBuf,
    document: RegistryDocument,
}

impl JsonSignatureRegistry {
    /// Load the document at `path`, or start empty if it does not exist
    pub fn open(path: &Path) -> Result<Self> {
        let document = if path.exists() {
            let text = fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|e| {
                WorkflowError::Registry(format!(
                    "{} is not a signature registry: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            RegistryDocument::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, path: &Path) -> Option<&SignatureRecord> {
        self.document.records.get(&path.to_string_lossy().into_owned())
    }

    pub fn len(&self) -> usize {
        self.document.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.records.is_empty()
    }
}

impl SignatureRegistry for JsonSignatureRegistry {
    fn record(&mut self, record: SignatureRecord) -> Result<()> {
        let key = record.path.to_string_lossy().into_owned();
        self.document.records.insert(key, record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target and rename so readers never see half a document
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(&self.document)?)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!(
            "Wrote {} signature records to {}",
            self.document.records.len(),
            self.path.display()
        );
        Ok(())
    }
}
