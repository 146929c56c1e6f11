//! Invocation-level error taxonomy.
//!
//! These never cross the runner boundary as errors: every variant is folded
//! into the `stderr` half of an `ExecutionResult`, and the `Display` text of
//! each variant is exactly what callers see there.

use std::time::Duration;

use crate::sandbox::SandboxError;

/// Why an invocation produced no output.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The sandbox time budget ran out before the command completed.
    #[error("Command execution timed out")]
    Timeout { budget: Duration },

    /// Create, staging or execution failed inside the isolation engine.
    #[error("Sandbox execution error: {0}")]
    Environment(#[from] SandboxError),

    /// Direct mode could not start the process.
    #[error("{0}")]
    Spawn(#[source] std::io::Error),

    /// Anything else, e.g. a panicking backend.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExecutionError {
    /// Spawn failure for a command vector with no program.
    pub fn empty_command() -> Self {
        ExecutionError::Spawn(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command vector",
        ))
    }

    /// Short machine-friendly label, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Timeout { .. } => "timeout",
            ExecutionError::Environment(_) => "environment",
            ExecutionError::Spawn(_) => "spawn",
            ExecutionError::Unknown(_) => "unknown",
        }
    }
}
