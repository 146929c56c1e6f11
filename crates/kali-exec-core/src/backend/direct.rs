//! Host execution with no isolation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::ExecutionBackend;
use crate::command::{CommandVector, ExecutionResult, FileStagingMap};
use crate::error::ExecutionError;
use crate::policy::IsolationPolicy;
use crate::runner::ExecutionMode;

/// Spawns the command vector directly on the host.
///
/// The program is not run through a shell. Direct mode applies no time
/// budget and no resource limits; `input_files` are ignored because the
/// command already sees the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectBackend;

#[async_trait]
impl ExecutionBackend for DirectBackend {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Direct
    }

    async fn run(
        &self,
        policy: &IsolationPolicy,
        command: &CommandVector,
        input_files: &FileStagingMap,
    ) -> Result<ExecutionResult, ExecutionError> {
        let Some(program) = command.program() else {
            return Err(ExecutionError::empty_command());
        };
        if !input_files.is_empty() {
            debug!(
                tool = policy.tool(),
                files = input_files.len(),
                "direct mode ignores staged input files"
            );
        }

        let output = Command::new(program)
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ExecutionError::Spawn)?;

        debug!(tool = policy.tool(), status = %output.status, "direct command finished");
        Ok(ExecutionResult::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}
