//! Configuration loader for poe-code-matrix
//!
//! This module provides configuration loading, validation, layering and
//! runner discovery.

use super::config::*;
use super::environment::ExecutionEnvironment;
use super::error::{MatrixError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable overriding the runner path
pub const RUNNER_ENV_VAR: &str = "POE_MATRIX_RUNNER";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Matrix file to load (optional)
    pub config_path: Option<PathBuf>,

    /// Runner path from the command line (highest priority)
    pub runner: Option<PathBuf>,

    /// Disable the credential bootstrap from the command line
    pub no_bootstrap: bool,

    /// Captured process environment
    pub env: ExecutionEnvironment,
}

/// Repository root a relative runner path is resolved against
///
/// The nearest ancestor of the running executable that contains `runner`,
/// so a binary under `<repo>/target/<profile>/` finds `<repo>`. Falls back
/// to the current directory when no ancestor matches.
pub fn repo_root(runner: &Path) -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    match find_repo_root(&exe, runner) {
        Some(root) => Ok(root),
        None => {
            tracing::debug!(exe = %exe.display(), "No runner next to executable, using current directory");
            Ok(std::env::current_dir()?)
        }
    }
}

/// Nearest ancestor directory of `start` containing `runner`
pub fn find_repo_root(start: &Path, runner: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(runner).is_file())
        .map(Path::to_path_buf)
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Matrix file (--config)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<MatrixConfig> {
        let mut config = MatrixConfig::default();

        if let Some(path) = &options.config_path {
            let file = Self::load_config_file(path).await?;
            Self::merge_into(&mut config, file);
        }

        if let Some(runner) = options.env.get(RUNNER_ENV_VAR).filter(|v| !v.is_empty()) {
            config.runner = PathBuf::from(runner);
        }

        if let Some(runner) = options.runner {
            config.runner = runner;
        }
        if options.no_bootstrap {
            config.options.bootstrap = false;
        }

        Self::validate(&config)?;

        tracing::debug!(
            groups = config.groups.len(),
            bootstrap = config.options.bootstrap,
            runner = %config.runner.display(),
            "Loaded matrix configuration"
        );

        Ok(config)
    }

    /// Load a matrix file from YAML
    async fn load_config_file(path: &Path) -> Result<MatrixConfigFile> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            MatrixError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            MatrixError::Config(format!(
                "Failed to parse YAML config {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Merge a matrix file into the target configuration
    fn merge_into(target: &mut MatrixConfig, source: MatrixConfigFile) {
        if let Some(groups) = source.groups {
            target.groups = groups;
        }
        if let Some(bootstrap) = source.bootstrap {
            target.options.bootstrap = bootstrap;
        }
        if let Some(runner) = source.runner {
            target.runner = runner;
        }
    }

    /// Validate a resolved configuration
    pub fn validate(config: &MatrixConfig) -> Result<()> {
        if config.groups.is_empty() {
            return Err(MatrixError::Config(
                "groups: at least one command group is required".to_string(),
            ));
        }

        for (i, group) in config.groups.iter().enumerate() {
            let index = i + 1;
            if group.is_empty() {
                return Err(MatrixError::Config(format!(
                    "groups[{}]: command group must not be empty",
                    index
                )));
            }
            if let Some(pos) = group.commands().iter().position(|c| c.trim().is_empty()) {
                return Err(MatrixError::Config(format!(
                    "groups[{}][{}]: command must not be blank",
                    index,
                    pos + 1
                )));
            }
        }

        if config.runner.as_os_str().is_empty() {
            return Err(MatrixError::Config("runner: path must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Resolve the runner path and check that it exists
///
/// Relative paths are joined onto `root`.
pub fn locate_runner(runner: &Path, root: &Path) -> Result<PathBuf> {
    let path = if runner.is_relative() {
        root.join(runner)
    } else {
        runner.to_path_buf()
    };

    if !path.exists() {
        return Err(MatrixError::RunnerNotFound { path });
    }

    Ok(path)
}
