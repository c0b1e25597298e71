pub mod core;
pub mod logging;
pub mod orchestration;
pub mod security;

pub use crate::core::*;
pub use orchestration::{
    GroupRunner, MatrixOrchestrator, ProcessGroupRunner, RunReport, RunState, RunnerInvocation,
};
pub use security::{CredentialResolver, build_login_command, redact};
