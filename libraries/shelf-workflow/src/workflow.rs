//! The three library workflows behind one interface

use crate::apply::{apply_moves, ApplyReport, JournalLayout};
use crate::dedup::{plan_dedup, DedupPlan};
use crate::journal::ScriptDialect;
use crate::options::{CleanerOptions, DedupOptions, MergeOptions, OptionDefinition, RawOptions};
use crate::plan::{plan_cleaner, plan_merge, MovePlan};
use crate::preview::{apply_summary, dedup_preview, move_preview, PreviewItem};
use crate::registry::{JsonSignatureRegistry, SignatureRecord, SignatureRegistry};
use crate::rollback::execute_rollback;
use crate::{Result, WorkflowError};
use serde::Serialize;
use shelf_metadata::{FfprobeTool, MediaProbe};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default number of individual moves or groups listed in a preview
pub const DEFAULT_PREVIEW_LIMIT: usize = 8;

/// Collaborators shared by every workflow call
pub struct WorkflowContext {
    pub probe: Box<dyn MediaProbe>,
    pub preview_limit: usize,
}

impl WorkflowContext {
    pub fn new(probe: Box<dyn MediaProbe>) -> Self {
        Self {
            probe,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new(Box::new(FfprobeTool::default()))
    }
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("probe_available", &self.probe.is_available())
            .field("preview_limit", &self.preview_limit)
            .finish()
    }
}

/// What apply or rollback reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowResult {
    pub summary_items: Vec<PreviewItem>,
    pub rollback_script: Option<PathBuf>,
    pub rollback_powershell_script: Option<PathBuf>,
    pub success: bool,
}

impl WorkflowResult {
    fn message(label: &str, value: impl Into<String>, success: bool) -> Self {
        Self {
            summary_items: vec![(label.to_string(), value.into())],
            rollback_script: None,
            rollback_powershell_script: None,
            success,
        }
    }

    fn from_apply(report: &ApplyReport, skipped_label: &str) -> Self {
        Self {
            summary_items: apply_summary(report, skipped_label),
            rollback_script: report.rollback_script(ScriptDialect::Posix).map(Path::to_path_buf),
            rollback_powershell_script: report
                .rollback_script(ScriptDialect::PowerShell)
                .map(Path::to_path_buf),
            success: report.summary.errors == 0,
        }
    }

    /// The rollback script to run on this platform, falling back to whichever exists
    pub fn rollback_script_for_host(&self) -> Option<&Path> {
        let (preferred, other) = match ScriptDialect::for_host() {
            ScriptDialect::Posix => (&self.rollback_script, &self.rollback_powershell_script),
            ScriptDialect::PowerShell => (&self.rollback_powershell_script, &self.rollback_script),
        };
        preferred.as_deref().or(other.as_deref())
    }
}

/// Common capability set of a workflow
pub trait WorkflowRunner {
    type Plan;

    /// Recognized option keys with labels and defaults
    fn option_definitions(&self) -> Vec<OptionDefinition>;

    /// Validate options and plan without modifying anything
    fn build_plan(&self, options: &RawOptions, ctx: &WorkflowContext) -> Result<Self::Plan>;

    fn preview(&self, plan: &Self::Plan, ctx: &WorkflowContext) -> Vec<PreviewItem>;

    /// Carry out a plan built from `options`
    fn apply(
        &self,
        options: &RawOptions,
        plan: Self::Plan,
        ctx: &WorkflowContext,
    ) -> Result<WorkflowResult>;

    fn rollback(&self, script: &Path) -> Result<WorkflowResult>;
}

fn run_rollback_script(script: &Path) -> Result<WorkflowResult> {
    let outcome = execute_rollback(script)?;
    let message = if outcome.success {
        "Rollback completed successfully".to_string()
    } else {
        match outcome.exit_code {
            Some(code) => format!("Failed with exit code {}", code),
            None => "Failed: interpreter terminated by a signal".to_string(),
        }
    };

    let mut result = WorkflowResult::message("Rollback", message, outcome.success);
    let stderr = outcome.stderr.trim();
    if !outcome.success && !stderr.is_empty() {
        result.summary_items.push(("Error output".to_string(), stderr.to_string()));
    }
    match ScriptDialect::from_path(script) {
        ScriptDialect::Posix => result.rollback_script = Some(outcome.script),
        ScriptDialect::PowerShell => result.rollback_powershell_script = Some(outcome.script),
    }
    Ok(result)
}

/// Reorganize a library into a templated layout
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryCleaner;

impl LibraryCleaner {
    pub const JOURNAL: JournalLayout = JournalLayout {
        workflow: "library_cleaner",
        history_dir: ".library_cleaner",
        dialects: &[ScriptDialect::Posix],
    };
}

impl WorkflowRunner for LibraryCleaner {
    type Plan = MovePlan;

    fn option_definitions(&self) -> Vec<OptionDefinition> {
        CleanerOptions::definitions()
    }

    fn build_plan(&self, options: &RawOptions, ctx: &WorkflowContext) -> Result<MovePlan> {
        let options = CleanerOptions::from_raw(options)?;
        plan_cleaner(&options, ctx.probe.as_ref())
    }

    fn preview(&self, plan: &MovePlan, ctx: &WorkflowContext) -> Vec<PreviewItem> {
        move_preview(plan, ctx.preview_limit, "Already organized")
    }

    fn apply(
        &self,
        options: &RawOptions,
        plan: MovePlan,
        _ctx: &WorkflowContext,
    ) -> Result<WorkflowResult> {
        let resolved = CleanerOptions::from_raw(options)?.resolved();
        let report = apply_moves(plan, &Self::JOURNAL, &resolved)?;
        Ok(WorkflowResult::from_apply(&report, "Already organized"))
    }

    fn rollback(&self, script: &Path) -> Result<WorkflowResult> {
        run_rollback_script(script)
    }
}

/// Move one library's files into another, keeping relative layout
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryMerge;

impl LibraryMerge {
    pub const JOURNAL: JournalLayout = JournalLayout {
        workflow: "library_merge",
        history_dir: ".library_merge",
        dialects: &[ScriptDialect::Posix, ScriptDialect::PowerShell],
    };
}

impl WorkflowRunner for LibraryMerge {
    type Plan = MovePlan;

    fn option_definitions(&self) -> Vec<OptionDefinition> {
        MergeOptions::definitions()
    }

    fn build_plan(&self, options: &RawOptions, _ctx: &WorkflowContext) -> Result<MovePlan> {
        plan_merge(&MergeOptions::from_raw(options)?)
    }

    fn preview(&self, plan: &MovePlan, ctx: &WorkflowContext) -> Vec<PreviewItem> {
        move_preview(plan, ctx.preview_limit, "Already merged")
    }

    fn apply(
        &self,
        options: &RawOptions,
        plan: MovePlan,
        _ctx: &WorkflowContext,
    ) -> Result<WorkflowResult> {
        let resolved = MergeOptions::from_raw(options)?.resolved();
        let report = apply_moves(plan, &Self::JOURNAL, &resolved)?;
        Ok(WorkflowResult::from_apply(&report, "Already merged"))
    }

    fn rollback(&self, script: &Path) -> Result<WorkflowResult> {
        run_rollback_script(script)
    }
}

/// Find byte-identical copies and record which one to keep
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryDedup;

impl LibraryDedup {
    /// Record every candidate of every group in `registry`
    pub fn record(plan: &DedupPlan, registry: &mut dyn SignatureRegistry) -> Result<usize> {
        let mut recorded = 0;
        for group in &plan.duplicates {
            for (index, candidate) in group.candidates.iter().enumerate() {
                let kept = index == group.best;
                let record = SignatureRecord::from_candidate(candidate, &plan.library_root, kept);
                registry.record(record)?;
                recorded += 1;
            }
        }
        registry.flush()?;
        Ok(recorded)
    }
}

impl WorkflowRunner for LibraryDedup {
    type Plan = DedupPlan;

    fn option_definitions(&self) -> Vec<OptionDefinition> {
        DedupOptions::definitions()
    }

    fn build_plan(&self, options: &RawOptions, ctx: &WorkflowContext) -> Result<DedupPlan> {
        let options = DedupOptions::from_raw(options)?;
        plan_dedup(&options, ctx.probe.as_ref())
    }

    fn preview(&self, plan: &DedupPlan, ctx: &WorkflowContext) -> Vec<PreviewItem> {
        dedup_preview(plan, ctx.preview_limit)
    }

    fn apply(
        &self,
        options: &RawOptions,
        plan: DedupPlan,
        _ctx: &WorkflowContext,
    ) -> Result<WorkflowResult> {
        let options = DedupOptions::from_raw(options)?;
        let mut registry = JsonSignatureRegistry::open(&options.db_path)?;
        let recorded = Self::record(&plan, &mut registry)?;

        tracing::info!(
            "Recorded {} signatures for {} duplicate groups in {}",
            recorded,
            plan.duplicates.len(),
            registry.path().display()
        );

        let mut summary_items = vec![
            ("Duplicate groups analyzed".to_string(), plan.duplicates.len().to_string()),
            ("Best tracks recorded".to_string(), plan.duplicates.len().to_string()),
            ("Signatures stored".to_string(), recorded.to_string()),
            ("Registry".to_string(), registry.path().display().to_string()),
        ];
        if !plan.skipped.is_empty() {
            summary_items.push(("Files skipped".to_string(), plan.skipped.len().to_string()));
        }

        Ok(WorkflowResult {
            summary_items,
            rollback_script: None,
            rollback_powershell_script: None,
            success: true,
        })
    }

    fn rollback(&self, _script: &Path) -> Result<WorkflowResult> {
        Ok(WorkflowResult::message(
            "Rollback",
            "No rollback available for deduplication",
            true,
        ))
    }
}

/// Plan produced by any workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkflowPlan {
    Moves(MovePlan),
    Dedup(DedupPlan),
}

impl WorkflowPlan {
    fn kind(&self) -> &'static str {
        match self {
            Self::Moves(_) => "move plan",
            Self::Dedup(_) => "dedup plan",
        }
    }
}

/// The closed set of workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    Cleaner,
    Merge,
    Dedup,
}

impl Workflow {
    pub const ALL: [Workflow; 3] = [Workflow::Cleaner, Workflow::Merge, Workflow::Dedup];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cleaner => "library_cleaner",
            Self::Merge => "library_merge",
            Self::Dedup => "library_dedup",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Cleaner => "Reorganize a library into an artist/album layout from tags",
            Self::Merge => "Move one library into another, keeping its layout",
            Self::Dedup => "Find byte-identical copies and record which to keep",
        }
    }

    /// History directory under the destination root
    pub fn history_dir_name(self) -> &'static str {
        match self {
            Self::Cleaner => LibraryCleaner::JOURNAL.history_dir,
            Self::Merge => LibraryMerge::JOURNAL.history_dir,
            Self::Dedup => ".library_dedup",
        }
    }

    pub fn option_definitions(self) -> Vec<OptionDefinition> {
        match self {
            Self::Cleaner => LibraryCleaner.option_definitions(),
            Self::Merge => LibraryMerge.option_definitions(),
            Self::Dedup => LibraryDedup.option_definitions(),
        }
    }

    pub fn build_plan(self, options: &RawOptions, ctx: &WorkflowContext) -> Result<WorkflowPlan> {
        Ok(match self {
            Self::Cleaner => WorkflowPlan::Moves(LibraryCleaner.build_plan(options, ctx)?),
            Self::Merge => WorkflowPlan::Moves(LibraryMerge.build_plan(options, ctx)?),
            Self::Dedup => WorkflowPlan::Dedup(LibraryDedup.build_plan(options, ctx)?),
        })
    }

    pub fn preview(self, plan: &WorkflowPlan, ctx: &WorkflowContext) -> Result<Vec<PreviewItem>> {
        Ok(match (self, plan) {
            (Self::Cleaner, WorkflowPlan::Moves(plan)) => LibraryCleaner.preview(plan, ctx),
            (Self::Merge, WorkflowPlan::Moves(plan)) => LibraryMerge.preview(plan, ctx),
            (Self::Dedup, WorkflowPlan::Dedup(plan)) => LibraryDedup.preview(plan, ctx),
            (workflow, plan) => return Err(workflow.mismatch(plan)),
        })
    }

    pub fn apply(
        self,
        options: &RawOptions,
        plan: WorkflowPlan,
        ctx: &WorkflowContext,
    ) -> Result<WorkflowResult> {
        match (self, plan) {
            (Self::Cleaner, WorkflowPlan::Moves(plan)) => LibraryCleaner.apply(options, plan, ctx),
            (Self::Merge, WorkflowPlan::Moves(plan)) => LibraryMerge.apply(options, plan, ctx),
            (Self::Dedup, WorkflowPlan::Dedup(plan)) => LibraryDedup.apply(options, plan, ctx),
            (workflow, plan) => Err(workflow.mismatch(&plan)),
        }
    }

    pub fn rollback(self, script: &Path) -> Result<WorkflowResult> {
        match self {
            Self::Cleaner => LibraryCleaner.rollback(script),
            Self::Merge => LibraryMerge.rollback(script),
            Self::Dedup => LibraryDedup.rollback(script),
        }
    }

    fn expected_plan(self) -> &'static str {
        match self {
            Self::Cleaner | Self::Merge => "move plan",
            Self::Dedup => "dedup plan",
        }
    }

    fn mismatch(self, plan: &WorkflowPlan) -> WorkflowError {
        WorkflowError::PlanMismatch {
            expected: self.expected_plan(),
            actual: plan.kind(),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workflow {
    type Err = WorkflowError;

    /// Accepts `cleaner` as well as `library_cleaner`
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        let short = name.strip_prefix("library_").unwrap_or(&name);
        match short {
            "cleaner" => Ok(Self::Cleaner),
            "merge" => Ok(Self::Merge),
            "dedup" => Ok(Self::Dedup),
            _ => Err(WorkflowError::UnknownWorkflow(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_metadata::NoProbe;
    use std::fs;
    use tempfile::TempDir;

    fn ctx() -> WorkflowContext {
        WorkflowContext::new(Box::new(NoProbe))
    }

    #[test]
    fn test_workflow_names_round_trip() {
        for workflow in Workflow::ALL {
            assert_eq!(workflow.name().parse::<Workflow>().unwrap(), workflow);
        }
        assert_eq!("Merge".parse::<Workflow>().unwrap(), Workflow::Merge);
        assert!(matches!(
            "rename".parse::<Workflow>(),
            Err(WorkflowError::UnknownWorkflow(_))
        ));
    }

    #[test]
    fn test_history_dirs() {
        assert_eq!(Workflow::Cleaner.history_dir_name(), ".library_cleaner");
        assert_eq!(Workflow::Merge.history_dir_name(), ".library_merge");
        assert_eq!(Workflow::Dedup.history_dir_name(), ".library_dedup");
    }

    #[test]
    fn test_dedup_rollback_is_noop() {
        let result = Workflow::Dedup.rollback(Path::new("/nonexistent.sh")).unwrap();
        assert!(result.success);
        assert_eq!(
            result.summary_items,
            vec![(
                "Rollback".to_string(),
                "No rollback available for deduplication".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_rollback_script_is_an_error() {
        let result = Workflow::Cleaner.rollback(Path::new("/nonexistent/rollback.sh"));
        assert!(matches!(result, Err(WorkflowError::RollbackScriptNotFound(_))));
    }

    #[test]
    fn test_plan_kind_mismatch() {
        let temp = TempDir::new().unwrap();
        let mut options = RawOptions::new();
        options.insert("library_path".to_string(), temp.path().display().to_string());

        let plan = Workflow::Dedup.build_plan(&options, &ctx()).unwrap();
        let err = Workflow::Cleaner.preview(&plan, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PlanMismatch {
                expected: "move plan",
                actual: "dedup plan"
            }
        ));
    }

    #[test]
    fn test_dedup_apply_records_without_deleting() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.mp3"), b"same").unwrap();
        fs::create_dir(root.join("copy")).unwrap();
        fs::write(root.join("copy").join("a.mp3"), b"same").unwrap();
        fs::write(root.join("b.mp3"), b"different").unwrap();

        let mut options = RawOptions::new();
        options.insert("library_path".to_string(), root.display().to_string());
        options.insert("use_ffprobe".to_string(), "false".to_string());

        let plan = Workflow::Dedup.build_plan(&options, &ctx()).unwrap();
        let result = Workflow::Dedup.apply(&options, plan, &ctx()).unwrap();

        assert!(result.success);
        assert!(result
            .summary_items
            .contains(&("Signatures stored".to_string(), "2".to_string())));
        assert!(root.join("a.mp3").exists());
        assert!(root.join("copy").join("a.mp3").exists());

        let registry =
            JsonSignatureRegistry::open(&root.join(".library_dedup").join("signatures.json")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_option_definitions_per_workflow() {
        let merge: Vec<&str> = Workflow::Merge
            .option_definitions()
            .iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(
            merge,
            vec!["source_library_path", "destination_library_path", "extensions"]
        );
    }
}
