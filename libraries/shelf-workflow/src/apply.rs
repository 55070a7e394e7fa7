//! Executes move plans
//!
//! Moves run one at a time in plan order. A failed move is recorded and the
//! run continues; a failure to write the journal aborts the run, since moves
//! past that point could not be rolled back.

use crate::journal::{RollbackScript, RunLog, RunPaths, ScriptDialect};
use crate::options::RawOptions;
use crate::plan::MovePlan;
use crate::Result;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where and how a workflow journals its runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalLayout {
    /// Workflow name used in artifact names
    pub workflow: &'static str,
    /// Directory under the destination root holding run artifacts
    pub history_dir: &'static str,
    pub dialects: &'static [ScriptDialect],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStatus {
    Moved,
    Error,
}

/// Result of one attempted move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: MoveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub collision: bool,
}

/// Counts written as the log's final summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub attempted: usize,
    pub moved: usize,
    pub errors: usize,
    pub skipped: usize,
}

/// Everything an apply run produced
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub summary: ApplySummary,
    pub outcomes: Vec<MoveOutcome>,
    pub log_path: PathBuf,
    pub rollback_scripts: Vec<(ScriptDialect, PathBuf)>,
}

impl ApplyReport {
    pub fn rollback_script(&self, dialect: ScriptDialect) -> Option<&Path> {
        self.rollback_scripts
            .iter()
            .find(|(d, _)| *d == dialect)
            .map(|(_, path)| path.as_path())
    }
}

/// Move a single file, refusing to replace anything at `destination`
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if destination.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Destination already exists: {}", destination.display()),
        ));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(source, destination)
}

/// Apply `plan`, journaling every move
pub fn apply_moves(
    plan: MovePlan,
    journal: &JournalLayout,
    options: &RawOptions,
) -> Result<ApplyReport> {
    let history_dir = plan.destination_root.join(journal.history_dir);
    fs::create_dir_all(&history_dir)?;

    let started = Local::now();
    let paths = RunPaths::allocate(&history_dir, journal.workflow, &started, journal.dialects);

    let mut log = RunLog::create(&paths.log, journal.workflow, options, &started)?;
    let mut scripts = paths
        .scripts
        .iter()
        .map(|(dialect, path)| RollbackScript::create(path, *dialect, journal.workflow, &started))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Applying {} moves for {} (log: {})",
        plan.moves.len(),
        journal.workflow,
        paths.log.display()
    );

    let mut outcomes = Vec::with_capacity(plan.moves.len());
    let mut moved = 0;
    let mut errors = 0;

    for action in plan.moves {
        let outcome = match move_file(&action.source, &action.destination) {
            Ok(()) => {
                for script in &mut scripts {
                    script.record(&action.source, &action.destination)?;
                }
                moved += 1;
                MoveOutcome {
                    source: action.source,
                    destination: action.destination,
                    status: MoveStatus::Moved,
                    error: None,
                    collision: action.collision,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to move {} to {}: {}",
                    action.source.display(),
                    action.destination.display(),
                    e
                );
                errors += 1;
                MoveOutcome {
                    source: action.source,
                    destination: action.destination,
                    status: MoveStatus::Error,
                    error: Some(e.to_string()),
                    collision: action.collision,
                }
            }
        };

        log.record(&outcome)?;
        outcomes.push(outcome);
    }

    let summary = ApplySummary {
        attempted: outcomes.len(),
        moved,
        errors,
        skipped: plan.skipped.len(),
    };

    log.finish(&summary)?;
    for script in scripts {
        script.finish()?;
    }

    tracing::info!(
        "{} finished: {} moved, {} errors, {} already in place",
        journal.workflow,
        summary.moved,
        summary.errors,
        summary.skipped
    );

    Ok(ApplyReport {
        summary,
        outcomes,
        log_path: paths.log,
        rollback_scripts: paths.scripts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::MoveAction;
    use tempfile::TempDir;

    const TEST_JOURNAL: JournalLayout = JournalLayout {
        workflow: "library_cleaner",
        history_dir: ".library_cleaner",
        dialects: &[ScriptDialect::Posix],
    };

    fn plan_for(root: &Path, moves: Vec<(PathBuf, PathBuf)>) -> MovePlan {
        MovePlan {
            source_root: root.to_path_buf(),
            destination_root: root.to_path_buf(),
            template: None,
            files_scanned: moves.len(),
            moves: moves
                .into_iter()
                .map(|(source, destination)| MoveAction {
                    source,
                    destination,
                    collision: false,
                })
                .collect(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_move_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.mp3");
        let destination = temp.path().join("x").join("y").join("a.mp3");
        fs::write(&source, b"audio").unwrap();

        move_file(&source, &destination).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"audio");
    }

    #[test]
    fn test_move_file_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.mp3");
        let destination = temp.path().join("b.mp3");
        fs::write(&source, b"new").unwrap();
        fs::write(&destination, b"old").unwrap();

        let err = move_file(&source, &destination).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&destination).unwrap(), b"old");
        assert!(source.exists());
    }

    #[test]
    fn test_apply_isolates_failures() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("one.mp3"), b"1").unwrap();
        fs::write(root.join("two.mp3"), b"2").unwrap();

        let plan = plan_for(
            root,
            vec![
                (root.join("missing.mp3"), root.join("out").join("missing.mp3")),
                (root.join("one.mp3"), root.join("out").join("one.mp3")),
                (root.join("two.mp3"), root.join("out").join("two.mp3")),
            ],
        );

        let report = apply_moves(plan, &TEST_JOURNAL, &RawOptions::new()).unwrap();

        assert_eq!(report.summary.attempted, 3);
        assert_eq!(report.summary.moved, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.outcomes[0].status, MoveStatus::Error);
        assert!(report.outcomes[0].error.is_some());
        assert!(root.join("out").join("two.mp3").exists());

        let log: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report.log_path).unwrap()).unwrap();
        assert_eq!(log["complete"], true);
        assert_eq!(log["results"].as_array().unwrap().len(), 3);
        assert_eq!(log["results"][1]["status"], "moved");
        assert!(log["results"][1].get("error").is_none());
        assert_eq!(log["summary"]["moved"], 2);

        let script = report.rollback_script(ScriptDialect::Posix).unwrap();
        assert!(script.starts_with(root.join(".library_cleaner")));
        let text = fs::read_to_string(script).unwrap();
        assert!(text.contains("undo_2()"));
        assert!(!text.contains("undo_3()"));
        assert!(report.rollback_script(ScriptDialect::PowerShell).is_none());
    }

    #[test]
    fn test_empty_plan_still_journals() {
        let temp = TempDir::new().unwrap();
        let report = apply_moves(plan_for(temp.path(), Vec::new()), &TEST_JOURNAL, &RawOptions::new())
            .unwrap();

        assert_eq!(report.summary.attempted, 0);
        assert!(report.log_path.exists());
    }
}
