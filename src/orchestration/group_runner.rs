//! Runner seam: hands one command group to the external container runner
//!
//! # Features
//!
//! - **One process per group**: the runner receives every step of a group as
//!   its own argument and is responsible for running them in order
//! - **No shell interpolation**: arguments are passed as a vector, never
//!   joined into a shell string on this side
//! - **Explicit environment**: the inherited environment is cleared and the
//!   augmented [`ExecutionEnvironment`] applied instead
//! - **Redacted debug output**: `Debug` on an invocation never shows the key

use crate::core::environment::ExecutionEnvironment;
use crate::core::error::{MatrixError, Result};
use crate::security::redaction::redact_all;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Argument list for one runner call: `[runner, step, step, ...]`
#[derive(Clone, PartialEq, Eq)]
pub struct RunnerInvocation {
    program: PathBuf,
    args: Vec<String>,
}

impl RunnerInvocation {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Steps passed to the runner, unredacted
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argument vector including the runner path
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Steps with the login command masked
    pub fn redacted_args(&self) -> Vec<String> {
        redact_all(&self.args)
    }
}

impl fmt::Debug for RunnerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerInvocation")
            .field("program", &self.program)
            .field("args", &self.redacted_args())
            .finish()
    }
}

/// Executes a command group
#[async_trait]
pub trait GroupRunner: Send + Sync {
    /// Run the invocation to completion and return its exit code
    async fn run(&self, invocation: &RunnerInvocation, env: &ExecutionEnvironment) -> Result<i32>;
}

/// Spawns the real runner process and waits for it
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupRunner;

impl ProcessGroupRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GroupRunner for ProcessGroupRunner {
    async fn run(&self, invocation: &RunnerInvocation, env: &ExecutionEnvironment) -> Result<i32> {
        tracing::debug!(?invocation, vars = env.len(), "Spawning runner");

        let status = Command::new(invocation.program())
            .args(invocation.args())
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| MatrixError::RunnerSpawn {
                path: invocation.program().to_path_buf(),
                source,
            })?;

        let code = exit_code(status);
        tracing::debug!(code, "Runner exited");
        Ok(code)
    }
}

/// Exit code of a finished process; signals map to `128 + signal` on Unix
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_argv_starts_with_runner() {
        let invocation = RunnerInvocation::new(
            "/repo/scripts/colima-runner.sh",
            vec!["cmd one".to_string(), "cmd two".to_string()],
        );

        assert_eq!(
            invocation.argv(),
            vec!["/repo/scripts/colima-runner.sh", "cmd one", "cmd two"]
        );
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let invocation = RunnerInvocation::new(
            "runner.sh",
            vec!["poe-code login --api-key hunter2".to_string()],
        );

        let debug = format!("{:?}", invocation);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
        assert_eq!(invocation.args()[0], "poe-code login --api-key hunter2");
    }

    #[cfg(unix)]
    fn script(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("runner.sh");
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_passes_args_and_env() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.txt");
        let runner = script(
            &temp_dir,
            "printf '%s\\n' \"$@\" > \"$OUT\"\nprintf '%s\\n' \"$COLIMA_DOCKER_ARGS\" >> \"$OUT\"\n",
        );

        // Run through /bin/sh so the script needs no exec bit
        let invocation = RunnerInvocation::new(
            "/bin/sh",
            vec![runner, "cmd one".to_string(), "it's \"quoted\"".to_string()],
        );
        let env: ExecutionEnvironment = [
            ("OUT", out.to_string_lossy().into_owned()),
            ("COLIMA_DOCKER_ARGS", "-e POE_CODE_STDERR_LOGS=1".to_string()),
        ]
        .into_iter()
        .collect();

        let code = ProcessGroupRunner::new().run(&invocation, &env).await.unwrap();

        assert_eq!(code, 0);
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            written.lines().collect::<Vec<_>>(),
            vec!["cmd one", "it's \"quoted\"", "-e POE_CODE_STDERR_LOGS=1"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_reports_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let runner = script(&temp_dir, "exit 7\n");

        let invocation = RunnerInvocation::new("/bin/sh", vec![runner]);
        let code = ProcessGroupRunner::new()
            .run(&invocation, &ExecutionEnvironment::default())
            .await
            .unwrap();

        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_maps_signals() {
        let temp_dir = TempDir::new().unwrap();
        let runner = script(&temp_dir, "kill -9 $$\n");

        let invocation = RunnerInvocation::new("/bin/sh", vec![runner]);
        let code = ProcessGroupRunner::new()
            .run(&invocation, &ExecutionEnvironment::default())
            .await
            .unwrap();

        assert_eq!(code, 137);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let invocation = RunnerInvocation::new("/nonexistent/colima-runner.sh", vec![]);

        let result = ProcessGroupRunner::new()
            .run(&invocation, &ExecutionEnvironment::default())
            .await;

        assert!(matches!(result, Err(MatrixError::RunnerSpawn { .. })));
    }
}
