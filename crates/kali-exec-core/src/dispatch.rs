//! Builds command runners from the process-wide configuration.

use std::sync::Arc;

use isolation_engine::IsolationEngine;

use crate::catalogue::{Action, Tool};
use crate::command::{ExecutionResult, FileStagingMap};
use crate::config::DispatchConfig;
use crate::policy::IsolationPolicy;
use crate::runner::{CommandRunner, ExecutionMode};

/// Holds the configuration and the shared engine handle, and hands out a
/// [`CommandRunner`] per tool with the execution mode already decided.
#[derive(Clone)]
pub struct ToolDispatcher {
    config: DispatchConfig,
    engine: Arc<dyn IsolationEngine>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(config: DispatchConfig, engine: Arc<dyn IsolationEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn mode(&self) -> ExecutionMode {
        self.config.mode()
    }

    /// Runner for an arbitrary policy.
    pub fn runner(&self, policy: IsolationPolicy) -> CommandRunner {
        match self.mode() {
            ExecutionMode::Direct => CommandRunner::direct(policy),
            ExecutionMode::Sandboxed => {
                CommandRunner::sandboxed(policy, Arc::clone(&self.engine), self.config.image.clone())
            }
        }
    }

    /// Runner for a catalogued tool.
    pub fn runner_for(&self, tool: Tool) -> CommandRunner {
        self.runner(tool.policy())
    }

    /// Build the action's command and run it under its tool's policy.
    pub async fn run_action(
        &self,
        action: &Action,
        input_files: Option<FileStagingMap>,
    ) -> ExecutionResult {
        self.runner_for(action.tool())
            .execute(action.command(), input_files)
            .await
    }
}
