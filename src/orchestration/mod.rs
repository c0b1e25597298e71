//! Orchestration layer for matrix runs
//!
//! This module provides the runner seam, the group orchestrator and the
//! top-level driver that maps outcomes to exit codes.

pub mod driver;
pub mod group_runner;
pub mod matrix_orchestrator;

// Re-export main types for convenience
pub use driver::{drive, report_failure};
pub use group_runner::{GroupRunner, ProcessGroupRunner, RunnerInvocation};
pub use matrix_orchestrator::{
    MatrixOrchestrator, RESET_COMMAND, RunReport, RunState, preview_steps,
};
