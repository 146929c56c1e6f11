//! Containerised execution with a hard time budget.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use isolation_engine::IsolationEngine;
use tracing::{debug, warn};

use super::ExecutionBackend;
use crate::command::{CommandVector, ExecutionResult, FileStagingMap};
use crate::error::ExecutionError;
use crate::policy::IsolationPolicy;
use crate::runner::ExecutionMode;
use crate::sandbox::{SandboxResult, SandboxSession, SandboxSettings};

/// Runs each command in a fresh container built from the invoking policy.
///
/// Every call owns its own [`SandboxSession`]. The policy's time budget
/// bounds creation, staging and execution together; cleanup always runs
/// afterwards, whether the call succeeded, failed or timed out, and also
/// reaches a container whose creation the budget cut short. An empty
/// command vector is refused before any container is created.
pub struct SandboxBackend {
    engine: Arc<dyn IsolationEngine>,
    image: String,
}

impl std::fmt::Debug for SandboxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxBackend")
            .field("engine", &self.engine.name())
            .field("image", &self.image)
            .finish()
    }
}

impl SandboxBackend {
    pub fn new(engine: Arc<dyn IsolationEngine>, image: impl Into<String>) -> Self {
        Self {
            engine,
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Settings for one run under `policy`.
    pub fn settings_for(&self, policy: &IsolationPolicy) -> SandboxSettings {
        SandboxSettings::from_policy(policy, self.image.clone())
    }
}

/// create → stage (in order) → exec. Stops at the first failure.
async fn drive(
    session: &mut SandboxSession,
    settings: &SandboxSettings,
    command: &str,
    input_files: &FileStagingMap,
) -> SandboxResult<String> {
    session.create(settings).await?;
    for (host_path, container_path) in input_files.iter() {
        session.copy_to_container(host_path, container_path).await?;
    }
    session.run_command(command).await
}

#[async_trait]
impl ExecutionBackend for SandboxBackend {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Sandboxed
    }

    async fn run(
        &self,
        policy: &IsolationPolicy,
        command: &CommandVector,
        input_files: &FileStagingMap,
    ) -> Result<ExecutionResult, ExecutionError> {
        if command.is_empty() {
            return Err(ExecutionError::empty_command());
        }
        let settings = self.settings_for(policy);
        let budget = settings.time_budget;
        let shell_command = command.shell_join();
        let started = Instant::now();

        let mut session = SandboxSession::new(Arc::clone(&self.engine));
        let outcome = tokio::time::timeout(
            budget,
            drive(&mut session, &settings, &shell_command, input_files),
        )
        .await;
        session.cleanup().await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(output)) => {
                debug!(tool = policy.tool(), elapsed_ms, "sandboxed command finished");
                Ok(ExecutionResult::output(output))
            }
            Ok(Err(e)) => {
                warn!(tool = policy.tool(), elapsed_ms, error = %e, "sandboxed command failed");
                Err(ExecutionError::Environment(e))
            }
            Err(_) => {
                warn!(
                    tool = policy.tool(),
                    elapsed_ms,
                    budget_secs = budget.as_secs(),
                    "sandboxed command timed out"
                );
                Err(ExecutionError::Timeout { budget })
            }
        }
    }
}
