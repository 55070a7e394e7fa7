//! Crash-consistent run journal
//!
//! Each apply run writes a JSON log and one rollback script per dialect into
//! the workflow's history directory. Every file is kept valid after each
//! recorded move: new entries overwrite a fixed trailer, the trailer is
//! written again behind them, and the data is synced before the next move.

use crate::collision::{resolve, ClaimedSet};
use crate::options::RawOptions;
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout used in artifact names
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A file made of a growing body followed by a replaceable trailer
#[derive(Debug)]
pub struct TrailerFile {
    file: File,
    path: PathBuf,
    body_len: u64,
}

impl TrailerFile {
    /// Create a new file holding `head` and `trailer`
    ///
    /// Fails if the file already exists.
    pub fn create(path: &Path, head: &str, trailer: &str) -> io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(head.as_bytes())?;
        file.write_all(trailer.as_bytes())?;
        file.sync_data()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            body_len: head.len() as u64,
        })
    }

    /// Append `chunk` to the body and re-write `trailer` after it
    pub fn append(&mut self, chunk: &str, trailer: &str) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.body_len))?;
        self.file.write_all(chunk.as_bytes())?;
        self.body_len += chunk.len() as u64;
        self.write_trailer(trailer)
    }

    /// Replace the trailer one last time
    pub fn finish(mut self, trailer: &str) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.body_len))?;
        self.write_trailer(trailer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_trailer(&mut self, trailer: &str) -> io::Result<()> {
        self.file.write_all(trailer.as_bytes())?;
        self.file.set_len(self.body_len + trailer.len() as u64)?;
        self.file.sync_data()
    }
}

const LOG_RUNNING_TRAILER: &str = "\n],\"complete\":false}\n";

/// JSON log of one apply run
///
/// The document always parses: `{"workflow", "options", "timestamp",
/// "results": [...], "complete": bool}` plus `"summary"` once finished.
#[derive(Debug)]
pub struct RunLog {
    file: TrailerFile,
    entries: usize,
}

impl RunLog {
    pub fn create(
        path: &Path,
        workflow: &str,
        options: &RawOptions,
        started: &DateTime<Local>,
    ) -> Result<Self> {
        let head = format!(
            "{{\"workflow\":{},\"options\":{},\"timestamp\":{},\"results\":[",
            serde_json::to_string(workflow)?,
            serde_json::to_string(options)?,
            serde_json::to_string(&started.to_rfc3339())?,
        );

        Ok(Self {
            file: TrailerFile::create(path, &head, LOG_RUNNING_TRAILER)?,
            entries: 0,
        })
    }

    /// Append one result entry and flush it to disk
    pub fn record<T: Serialize>(&mut self, entry: &T) -> Result<()> {
        let separator = if self.entries == 0 { "\n  " } else { ",\n  " };
        let chunk = format!("{}{}", separator, serde_json::to_string(entry)?);
        self.file.append(&chunk, LOG_RUNNING_TRAILER)?;
        self.entries += 1;
        Ok(())
    }

    /// Mark the run complete and attach `summary`
    pub fn finish<S: Serialize>(self, summary: &S) -> Result<()> {
        let trailer = format!(
            "\n],\"complete\":true,\"summary\":{}}}\n",
            serde_json::to_string(summary)?
        );
        self.file.finish(&trailer)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Shell language of a rollback script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptDialect {
    /// `/bin/sh`
    Posix,
    PowerShell,
}

impl ScriptDialect {
    /// Dialect native to the running platform
    pub fn for_host() -> Self {
        if cfg!(windows) {
            Self::PowerShell
        } else {
            Self::Posix
        }
    }

    /// Dialect implied by a script's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ps1") => Self::PowerShell,
            _ => Self::Posix,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Posix => "sh",
            Self::PowerShell => "ps1",
        }
    }

    fn quote(self, path: &Path) -> String {
        let text = path.to_string_lossy();
        match self {
            Self::Posix => format!("'{}'", text.replace('\'', "'\\''")),
            Self::PowerShell => format!("'{}'", text.replace('\'', "''")),
        }
    }

    fn head(self, workflow: &str, started: &DateTime<Local>) -> String {
        match self {
            Self::Posix => format!(
                "#!/bin/sh\n\
                 # Rollback for {} run started {}\n\
                 # Undoes moves newest first; moves whose original path is taken are left alone.\n\
                 set -eu\n\
                 steps=\"\"\n",
                workflow,
                started.to_rfc3339()
            ),
            Self::PowerShell => format!(
                "# Rollback for {} run started {}\n\
                 # Undoes moves newest first; moves whose original path is taken are left alone.\n\
                 $ErrorActionPreference = 'Stop'\n\
                 $steps = @()\n",
                workflow,
                started.to_rfc3339()
            ),
        }
    }

    fn entry(self, step: usize, original: &Path, moved_to: &Path) -> String {
        let parent = original.parent().unwrap_or(original);
        let (src, dst, dir) = (
            self.quote(original),
            self.quote(moved_to),
            self.quote(parent),
        );

        match self {
            Self::Posix => format!(
                "\nundo_{step}() {{\n  \
                 if [ -e {dst} ] && [ ! -e {src} ]; then\n    \
                 mkdir -p {dir}\n    \
                 mv {dst} {src}\n  \
                 fi\n\
                 }}\n\
                 steps=\"{step} $steps\"\n"
            ),
            Self::PowerShell => format!(
                "\nfunction Undo-Step{step} {{\n  \
                 if ((Test-Path -LiteralPath {dst}) -and -not (Test-Path -LiteralPath {src})) {{\n    \
                 New-Item -ItemType Directory -Force -Path {dir} | Out-Null\n    \
                 Move-Item -LiteralPath {dst} -Destination {src}\n  \
                 }}\n\
                 }}\n\
                 $steps = @({step}) + $steps\n"
            ),
        }
    }

    fn trailer(self) -> &'static str {
        match self {
            Self::Posix => "\nfor step in $steps; do\n  \"undo_$step\"\ndone\n",
            Self::PowerShell => "\nforeach ($step in $steps) {\n  & \"Undo-Step$step\"\n}\n",
        }
    }
}

/// Rollback script that grows one undo step per successful move
#[derive(Debug)]
pub struct RollbackScript {
    dialect: ScriptDialect,
    file: TrailerFile,
    steps: usize,
}

impl RollbackScript {
    pub fn create(
        path: &Path,
        dialect: ScriptDialect,
        workflow: &str,
        started: &DateTime<Local>,
    ) -> Result<Self> {
        let file = TrailerFile::create(path, &dialect.head(workflow, started), dialect.trailer())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if dialect == ScriptDialect::Posix {
                fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
            }
        }

        Ok(Self {
            dialect,
            file,
            steps: 0,
        })
    }

    /// Register the undo of a move from `original` to `moved_to`
    pub fn record(&mut self, original: &Path, moved_to: &Path) -> Result<()> {
        self.steps += 1;
        let chunk = self.dialect.entry(self.steps, original, moved_to);
        self.file.append(&chunk, self.dialect.trailer())?;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        let trailer = self.dialect.trailer();
        self.file.finish(trailer)?;
        Ok(())
    }

    pub fn dialect(&self) -> ScriptDialect {
        self.dialect
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }
}

/// Artifact locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub log: PathBuf,
    pub scripts: Vec<(ScriptDialect, PathBuf)>,
}

impl RunPaths {
    /// Pick unused names `<workflow>_<timestamp>.json` and matching
    /// `<stem>_rollback.<ext>` scripts inside `history_dir`
    pub fn allocate(
        history_dir: &Path,
        workflow: &str,
        started: &DateTime<Local>,
        dialects: &[ScriptDialect],
    ) -> Self {
        let stamp = started.format(RUN_TIMESTAMP_FORMAT);
        let base = history_dir.join(format!("{}_{}.json", workflow, stamp));
        let mut claimed = ClaimedSet::new();

        loop {
            let (log, _) = resolve(&base, &claimed);
            let stem = log
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let scripts: Vec<(ScriptDialect, PathBuf)> = dialects
                .iter()
                .map(|dialect| {
                    let name = format!("{}_rollback.{}", stem, dialect.extension());
                    (*dialect, history_dir.join(name))
                })
                .collect();

            if scripts.iter().all(|(_, path)| path.symlink_metadata().is_err()) {
                return Self { log, scripts };
            }

            // A script without its log still owns the name
            claimed.claim(log);
        }
    }
}
