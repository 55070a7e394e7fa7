//! Shelf Workflow
//!
//! Plan, apply, and roll back library reorganizations.
//!
//! This crate provides:
//! - Library scanning and destination templates
//! - Collision-free move planning for the cleaner and merge workflows
//! - An apply engine that journals every move and writes rollback scripts
//! - Duplicate detection by content signature with best-copy selection
//! - The `Workflow` enum tying the three workflows together
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_workflow::{RawOptions, Workflow, WorkflowContext};
//!
//! # fn main() -> shelf_workflow::Result<()> {
//! let mut options = RawOptions::new();
//! options.insert("library_path".to_string(), "/music".to_string());
//!
//! let ctx = WorkflowContext::default();
//! let plan = Workflow::Cleaner.build_plan(&options, &ctx)?;
//! for (label, value) in Workflow::Cleaner.preview(&plan, &ctx)? {
//!     println!("{label}: {value}");
//! }
//!
//! let result = Workflow::Cleaner.apply(&options, plan, &ctx)?;
//! println!("rollback with {:?}", result.rollback_script);
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod collision;
pub mod dedup;
mod error;
pub mod journal;
pub mod options;
pub mod path_template;
pub mod plan;
pub mod preview;
pub mod registry;
pub mod rollback;
pub mod scanner;
pub mod workflow;

pub use apply::{
    apply_moves, move_file, ApplyReport, ApplySummary, JournalLayout, MoveOutcome, MoveStatus,
};
pub use collision::{resolve, resolve_for, ClaimedSet};
pub use dedup::{
    fingerprint, group_duplicates, plan_dedup, select_best, AudioCandidate, DedupPlan,
    DuplicateGroup,
};
pub use error::{ValidationErrors, ValidationIssue, WorkflowError};
pub use journal::{RollbackScript, RunLog, ScriptDialect};
pub use options::{
    expand_path, CleanerOptions, DedupOptions, MergeOptions, OptionDefinition, ProbePreference,
    RawOptions,
};
pub use path_template::{PathTemplate, DEFAULT_TEMPLATE};
pub use plan::{plan_cleaner, plan_merge, MoveAction, MovePlan};
pub use preview::PreviewItem;
pub use registry::{JsonSignatureRegistry, SignatureRecord, SignatureRegistry};
pub use rollback::{execute_rollback, RollbackOutcome};
pub use scanner::{scan_library, ExtensionSet, FileScanner};
pub use workflow::{
    LibraryCleaner, LibraryDedup, LibraryMerge, Workflow, WorkflowContext, WorkflowPlan,
    WorkflowResult, WorkflowRunner, DEFAULT_PREVIEW_LIMIT,
};

/// Result type alias using `WorkflowError`
pub type Result<T> = std::result::Result<T, WorkflowError>;
