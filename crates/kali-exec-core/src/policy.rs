//! Per-tool isolation policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Memory ceiling applied when a tool does not ask for more.
pub const DEFAULT_MEMORY_LIMIT: &str = "1g";
/// One full CPU.
pub const DEFAULT_CPU_LIMIT: f64 = 1.0;
/// Wall-clock budget applied when a tool does not ask for more.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(120);

/// Resource and network constraints attached to one tool.
///
/// Built once with the `with_*` methods and then handed to a
/// `CommandRunner`, which only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationPolicy {
    tool: String,
    network_enabled: bool,
    memory_limit: String,
    cpu_limit: f64,
    time_budget: Duration,
}

impl IsolationPolicy {
    /// Policy for `tool` with no network, 1g memory, one CPU, 120s.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            network_enabled: false,
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            cpu_limit: DEFAULT_CPU_LIMIT,
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }

    pub fn with_network(mut self, enabled: bool) -> Self {
        self.network_enabled = enabled;
        self
    }

    pub fn with_memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.memory_limit = limit.into();
        self
    }

    pub fn with_cpu_limit(mut self, cpus: f64) -> Self {
        self.cpu_limit = cpus;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn network_enabled(&self) -> bool {
        self.network_enabled
    }

    pub fn memory_limit(&self) -> &str {
        &self.memory_limit
    }

    pub fn cpu_limit(&self) -> f64 {
        self.cpu_limit
    }

    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }
}
