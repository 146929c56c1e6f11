//! Execution backends.
//!
//! A backend turns one `(policy, command, staged files)` triple into an
//! `ExecutionResult`, or an `ExecutionError` the runner folds into stderr.

mod direct;
mod sandbox;

pub use direct::DirectBackend;
pub use sandbox::SandboxBackend;

use async_trait::async_trait;

use crate::command::{CommandVector, ExecutionResult, FileStagingMap};
use crate::error::ExecutionError;
use crate::policy::IsolationPolicy;
use crate::runner::ExecutionMode;

/// One way of running a command: on the host, or inside a sandbox.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// The mode this backend implements.
    fn mode(&self) -> ExecutionMode;

    async fn run(
        &self,
        policy: &IsolationPolicy,
        command: &CommandVector,
        input_files: &FileStagingMap,
    ) -> Result<ExecutionResult, ExecutionError>;
}
