//! Configuration structures and types for poe-code-matrix
//!
//! This module provides the built-in command-group table and the type-safe
//! matrix configuration with serde support.

use serde::Deserialize;
use std::path::PathBuf;

/// Default runner location, relative to the repository root
pub const DEFAULT_RUNNER: &str = "scripts/colima-runner.sh";

/// Built-in matrix: one install/configure/test flow and one isolated test
/// flow per supported coding assistant.
const BUILTIN_GROUPS: &[&[&str]] = &[
    &[
        "poe-code install claude-code",
        "poe-code configure claude-code --yes",
        "poe-code test claude-code",
    ],
    &[
        "poe-code install claude-code",
        "poe-code test claude-code --isolated",
    ],
    &[
        "poe-code install codex",
        "poe-code configure codex --yes",
        "poe-code test codex",
    ],
    &["poe-code install codex", "poe-code test codex --isolated"],
    &[
        "poe-code install opencode",
        "poe-code configure opencode --yes",
        "poe-code test opencode",
    ],
    &[
        "poe-code install opencode",
        "poe-code test opencode --isolated",
    ],
];

/// An ordered list of shell commands forming one workflow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CommandGroup(Vec<String>);

impl CommandGroup {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(commands.into_iter().map(Into::into).collect())
    }

    pub fn commands(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The built-in command groups
pub fn builtin_groups() -> Vec<CommandGroup> {
    BUILTIN_GROUPS
        .iter()
        .map(|commands| CommandGroup::new(commands.iter().copied()))
        .collect()
}

/// Options controlling how each group is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Resolve a credential and prepend the reset + login steps to every group
    pub bootstrap: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { bootstrap: true }
    }
}

/// Fully resolved matrix configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixConfig {
    /// Command groups, run in order
    pub groups: Vec<CommandGroup>,

    /// Dispatch options
    pub options: RunOptions,

    /// Runner path (relative paths resolve against the repository root)
    pub runner: PathBuf,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            groups: builtin_groups(),
            options: RunOptions::default(),
            runner: PathBuf::from(DEFAULT_RUNNER),
        }
    }
}

/// On-disk matrix file; every field is optional and overrides the defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixConfigFile {
    /// Replacement command-group list
    pub groups: Option<Vec<CommandGroup>>,

    /// Enable the credential bootstrap (default: true)
    pub bootstrap: Option<bool>,

    /// Runner path
    pub runner: Option<PathBuf>,
}
