//! Runs rollback scripts produced by apply

use crate::journal::ScriptDialect;
use crate::{Result, WorkflowError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What happened when a rollback script ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    pub script: PathBuf,
    pub success: bool,
    /// `None` when the interpreter was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn interpreter(dialect: ScriptDialect, script: &Path) -> Command {
    match dialect {
        ScriptDialect::Posix => {
            let mut command = Command::new(if cfg!(windows) { "sh" } else { "/bin/sh" });
            command.arg(script);
            command
        }
        ScriptDialect::PowerShell => {
            let mut command = Command::new(if cfg!(windows) { "powershell" } else { "pwsh" });
            command
                .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
                .arg(script);
            command
        }
    }
}

/// Run `script` with the interpreter its extension names
///
/// A missing script is an error. A script that runs and fails is reported
/// through [`RollbackOutcome::success`] together with its output.
pub fn execute_rollback(script: &Path) -> Result<RollbackOutcome> {
    if !script.is_file() {
        return Err(WorkflowError::RollbackScriptNotFound(
            script.display().to_string(),
        ));
    }

    let dialect = ScriptDialect::from_path(script);
    tracing::info!("Running rollback script {}", script.display());

    let output = interpreter(dialect, script).output()?;
    let outcome = RollbackOutcome {
        script: script.to_path_buf(),
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if outcome.success {
        tracing::info!("Rollback finished: {}", script.display());
    } else {
        tracing::warn!(
            "Rollback script {} exited with {:?}: {}",
            script.display(),
            outcome.exit_code,
            outcome.stderr.trim()
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_script() {
        let result = execute_rollback(Path::new("/nonexistent/rollback.sh"));
        assert!(matches!(result, Err(WorkflowError::RollbackScriptNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script_reports_output() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("fail.sh");
        fs::write(&script, "echo restoring\necho broken >&2\nexit 3\n").unwrap();

        let outcome = execute_rollback(&script).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, "restoring\n");
        assert_eq!(outcome.stderr, "broken\n");
    }
}
