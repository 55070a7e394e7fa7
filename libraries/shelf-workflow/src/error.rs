//! Error types for library workflows

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid options:\n{0}")]
    Validation(ValidationErrors),

    #[error("Library path does not exist: {0}")]
    LibraryNotFound(String),

    #[error("Library path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid template: {0}")]
    Template(String),

    #[error("Rollback script not found: {0}")]
    RollbackScriptNotFound(String),

    #[error("Plan was built by {actual}, not {expected}")]
    PlanMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Core(#[from] shelf_core::ShelfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One problem found while validating an options bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Option key the problem belongs to
    pub key: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Every validation problem found in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            key: key.into(),
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True when any issue concerns `key`
    pub fn mentions(&self, key: &str) -> bool {
        self.issues.iter().any(|issue| issue.key == key)
    }

    /// `Ok(value)` when no issues were collected
    pub fn into_result<T>(self, value: T) -> Result<T, WorkflowError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(WorkflowError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}
