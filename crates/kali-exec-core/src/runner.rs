//! The command runner: the single entry point tool actions call.

use std::sync::Arc;
use std::time::Instant;

use isolation_engine::IsolationEngine;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::backend::{DirectBackend, ExecutionBackend, SandboxBackend};
use crate::command::{CommandVector, ExecutionResult, FileStagingMap};
use crate::error::ExecutionError;
use crate::policy::IsolationPolicy;

/// Where a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// On the host, unbounded.
    Direct,
    /// In a fresh, resource-bounded container.
    Sandboxed,
}

impl ExecutionMode {
    pub fn from_safe_mode(safe_mode: bool) -> Self {
        if safe_mode {
            ExecutionMode::Sandboxed
        } else {
            ExecutionMode::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Direct => "direct",
            ExecutionMode::Sandboxed => "sandboxed",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs commands for one tool under a fixed [`IsolationPolicy`].
///
/// The execution mode is chosen at construction by picking the backend;
/// nothing is read from the environment at call time. `execute` never
/// fails: every error, including a panicking backend, comes back as
/// `("", message)`.
#[derive(Clone)]
pub struct CommandRunner {
    policy: Arc<IsolationPolicy>,
    backend: Arc<dyn ExecutionBackend>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("policy", &self.policy)
            .field("mode", &self.backend.mode())
            .finish()
    }
}

impl CommandRunner {
    pub fn new(policy: IsolationPolicy, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            policy: Arc::new(policy),
            backend,
        }
    }

    /// Runner that executes directly on the host.
    pub fn direct(policy: IsolationPolicy) -> Self {
        Self::new(policy, Arc::new(DirectBackend))
    }

    /// Runner that executes in containers built from `image`.
    pub fn sandboxed(
        policy: IsolationPolicy,
        engine: Arc<dyn IsolationEngine>,
        image: impl Into<String>,
    ) -> Self {
        Self::new(policy, Arc::new(SandboxBackend::new(engine, image)))
    }

    pub fn policy(&self) -> &IsolationPolicy {
        &self.policy
    }

    pub fn mode(&self) -> ExecutionMode {
        self.backend.mode()
    }

    /// Run `command`, staging `input_files` first in sandboxed mode.
    ///
    /// Direct mode ignores `input_files`. Each call runs as its own task so
    /// concurrent calls never share a container or process.
    #[instrument(
        name = "execute",
        skip_all,
        fields(tool = %self.policy.tool(), mode = %self.mode(), program = command.program().unwrap_or(""))
    )]
    pub async fn execute(
        &self,
        command: CommandVector,
        input_files: Option<FileStagingMap>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let policy = Arc::clone(&self.policy);
        let backend = Arc::clone(&self.backend);
        let input_files = input_files.unwrap_or_default();

        let task = tokio::spawn(async move { backend.run(&policy, &command, &input_files).await });
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(ExecutionError::Unknown(join_err.to_string())),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                info!(elapsed_ms, success = result.is_success(), "invocation finished");
                result
            }
            Err(e) => {
                warn!(elapsed_ms, kind = e.kind(), error = %e, "invocation failed");
                ExecutionResult::from(e)
            }
        }
    }
}
