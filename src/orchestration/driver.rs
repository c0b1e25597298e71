//! Top-level driver: turns a run outcome into diagnostics and an exit code

use crate::core::config::CommandGroup;
use crate::core::error::MatrixError;
use crate::orchestration::group_runner::GroupRunner;
use crate::orchestration::matrix_orchestrator::MatrixOrchestrator;
use std::io::Write;

/// Run the matrix and return the process exit code
///
/// 0 on success, the runner's exit code when a group fails, 1 for anything
/// else. Every failure writes a diagnostic to `stderr`.
pub async fn drive<R, W>(
    orchestrator: &mut MatrixOrchestrator<R, W>,
    groups: Option<&[CommandGroup]>,
    stderr: &mut dyn Write,
) -> i32
where
    R: GroupRunner,
    W: Write,
{
    match orchestrator.run_all(groups).await {
        Ok(_) => 0,
        Err(e) => report_failure(&e, stderr),
    }
}

/// Write a diagnostic for `error` and return its exit code
pub fn report_failure(error: &MatrixError, stderr: &mut dyn Write) -> i32 {
    let message = match error {
        MatrixError::GroupFailed { code, commands, .. } => {
            format!("\nCommand failed with exit code {}: {:?}", code, commands)
        }
        MatrixError::RunnerNotFound { .. }
        | MatrixError::Credential(_)
        | MatrixError::Config(_) => {
            format!("\n❌ {}", error)
        }
        _ => format!("\nUnexpected error: {}", error),
    };

    // Write failures on stderr are ignored; the exit code still reports the error
    let _ = writeln!(stderr, "{}", message);
    for action in error.suggested_actions() {
        let _ = writeln!(stderr, "  - {}", action);
    }
    let _ = stderr.flush();

    tracing::debug!(code = error.code(), "Run failed");
    error.exit_code()
}
