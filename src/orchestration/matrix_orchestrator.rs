//! Matrix Orchestrator - runs command groups through the container runner
//!
//! Manages one matrix run:
//! - Runner discovery and environment augmentation
//! - One-time credential resolution and login bootstrap
//! - Redacted trace output before each group starts
//! - Sequential dispatch with stop-on-first-failure

use crate::core::config::{CommandGroup, MatrixConfig, RunOptions};
use crate::core::environment::{ExecutionEnvironment, augment_environment};
use crate::core::error::{MatrixError, Result};
use crate::orchestration::group_runner::{GroupRunner, RunnerInvocation};
use crate::security::credential_resolver::CredentialResolver;
use crate::security::redaction::{LOGIN_PREFIX, MASK, build_login_command, redact, redact_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Wipes the CLI's local state and recreates its log directory
pub const RESET_COMMAND: &str = "rm -rf ~/.poe-code && mkdir -p ~/.poe-code/logs";

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ResolveCredential,
    /// Running the group with this 1-based index
    RunGroup(usize),
    Done,
    Failed,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub groups_run: usize,
    pub state: RunState,
    pub duration: Duration,
}

/// Runs a matrix of command groups, one runner call per group
pub struct MatrixOrchestrator<R, W = io::Stdout> {
    runner: R,
    runner_path: PathBuf,
    groups: Vec<CommandGroup>,
    options: RunOptions,
    base_env: ExecutionEnvironment,
    resolver: Option<CredentialResolver>,
    out: W,
    state: RunState,
    transitions: Vec<RunState>,
}

impl<R: GroupRunner> MatrixOrchestrator<R, io::Stdout> {
    /// Create an orchestrator printing its trace to stdout
    ///
    /// # Arguments
    ///
    /// * `runner` - Executes each group
    /// * `runner_path` - Located runner executable
    /// * `config` - Groups and run options
    /// * `base_env` - Environment captured at startup
    pub fn new<P: Into<PathBuf>>(
        runner: R,
        runner_path: P,
        config: MatrixConfig,
        base_env: ExecutionEnvironment,
    ) -> Self {
        Self {
            runner,
            runner_path: runner_path.into(),
            groups: config.groups,
            options: config.options,
            base_env,
            resolver: None,
            out: io::stdout(),
            state: RunState::Init,
            transitions: Vec::new(),
        }
    }
}

impl<R: GroupRunner, W: Write> MatrixOrchestrator<R, W> {
    /// Replace the trace output
    pub fn with_output<W2: Write>(self, out: W2) -> MatrixOrchestrator<R, W2> {
        MatrixOrchestrator {
            runner: self.runner,
            runner_path: self.runner_path,
            groups: self.groups,
            options: self.options,
            base_env: self.base_env,
            resolver: self.resolver,
            out,
            state: self.state,
            transitions: self.transitions,
        }
    }

    /// Use `resolver` instead of the standard lookup chain
    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn runner_path(&self) -> &Path {
        &self.runner_path
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn transitions(&self) -> &[RunState] {
        &self.transitions
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run every group in order, stopping at the first failure
    ///
    /// `groups` overrides the configured list; `None` or an empty slice
    /// runs the configured groups.
    pub async fn run_all(&mut self, groups: Option<&[CommandGroup]>) -> Result<RunReport> {
        let started = Instant::now();
        let groups = match groups {
            Some(groups) if !groups.is_empty() => groups.to_vec(),
            _ => self.groups.clone(),
        };

        match self.run_groups(&groups).await {
            Ok(()) => {
                self.transition(RunState::Done);
                let report = RunReport {
                    groups_run: groups.len(),
                    state: self.state,
                    duration: started.elapsed(),
                };
                writeln!(
                    self.out,
                    "\n✅ All {} command groups passed ({:.1}s)",
                    report.groups_run,
                    report.duration.as_secs_f64()
                )?;
                self.out.flush()?;
                Ok(report)
            }
            Err(e) => {
                self.transition(RunState::Failed);
                tracing::debug!(code = e.code(), "Matrix run failed");
                Err(e)
            }
        }
    }

    async fn run_groups(&mut self, groups: &[CommandGroup]) -> Result<()> {
        if !self.runner_path.exists() {
            return Err(MatrixError::RunnerNotFound {
                path: self.runner_path.clone(),
            });
        }

        let env = augment_environment(&self.base_env);
        let prefix = self.bootstrap_prefix()?;

        for (i, group) in groups.iter().enumerate() {
            let index = i + 1;
            self.transition(RunState::RunGroup(index));

            let steps: Vec<String> = prefix
                .iter()
                .chain(group.commands())
                .cloned()
                .collect();

            self.print_trace(index, &steps)?;

            let invocation = RunnerInvocation::new(self.runner_path.clone(), steps);
            let code = self.runner.run(&invocation, &env).await?;

            if code != 0 {
                return Err(MatrixError::GroupFailed {
                    index,
                    code,
                    commands: invocation.redacted_args(),
                });
            }
            tracing::info!(index, "Command group passed");
        }

        Ok(())
    }

    /// Reset + login steps, or nothing when the bootstrap is disabled
    fn bootstrap_prefix(&mut self) -> Result<Vec<String>> {
        if !self.options.bootstrap {
            return Ok(Vec::new());
        }

        self.transition(RunState::ResolveCredential);
        // Built on first use so a run without bootstrap never touches credentials
        let credential = match &self.resolver {
            Some(resolver) => resolver.resolve()?,
            None => CredentialResolver::standard(&self.base_env).resolve()?,
        };
        let login = build_login_command(&credential)?;

        Ok(vec![RESET_COMMAND.to_string(), login])
    }

    /// Print the group marker and every step, flushed before the runner starts
    fn print_trace(&mut self, index: usize, steps: &[String]) -> io::Result<()> {
        writeln!(self.out, "\n=== Command group {} ===", index)?;
        for step in steps {
            writeln!(self.out, "\n>>> {}", redact(step))?;
        }
        self.out.flush()
    }

    fn transition(&mut self, to: RunState) {
        tracing::debug!(from = ?self.state, ?to, "Run state transition");
        self.state = to;
        self.transitions.push(to);
    }
}

/// Describe the steps a group would run, redacted, without running anything
pub fn preview_steps(group: &CommandGroup, options: RunOptions) -> Vec<String> {
    let mut steps = Vec::with_capacity(group.len() + 2);
    if options.bootstrap {
        steps.push(RESET_COMMAND.to_string());
        steps.push(format!("{}{}", LOGIN_PREFIX, MASK));
    }
    steps.extend(redact_all(group.commands()));
    steps
}
