//! Sandbox settings derived from an isolation policy.

use std::sync::OnceLock;
use std::time::Duration;

use isolation_engine::ContainerSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{SandboxError, SandboxResult};
use crate::policy::IsolationPolicy;

/// Base image used when none is configured.
pub const DEFAULT_IMAGE: &str = "kalilinux/kali-rolling";
/// Network mode used when networking is enabled.
pub const DEFAULT_NETWORK_MODE: &str = "bridge";
/// Network mode that removes networking entirely.
pub const NO_NETWORK_MODE: &str = "none";

/// Configuration for one sandbox environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Base image reference.
    pub image: String,
    /// Hard memory ceiling (e.g. "1g").
    pub memory_limit: String,
    /// CPU share (1.0 = one core).
    pub cpu_limit: f64,
    /// Whether the environment gets a network at all.
    pub network_enabled: bool,
    /// Network mode used when `network_enabled` is set.
    pub network_mode: String,
    /// Wall-clock budget for create + staging + execution.
    pub time_budget: Duration,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            memory_limit: "2g".to_string(),
            cpu_limit: 1.0,
            network_enabled: true,
            network_mode: DEFAULT_NETWORK_MODE.to_string(),
            time_budget: Duration::from_secs(300),
        }
    }
}

impl SandboxSettings {
    /// Settings for `policy` on top of `image`.
    pub fn from_policy(policy: &IsolationPolicy, image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            memory_limit: policy.memory_limit().to_string(),
            cpu_limit: policy.cpu_limit(),
            network_enabled: policy.network_enabled(),
            network_mode: DEFAULT_NETWORK_MODE.to_string(),
            time_budget: policy.time_budget(),
        }
    }

    /// The mode actually handed to the engine: `none` unless networking is on.
    pub fn effective_network_mode(&self) -> &str {
        if self.network_enabled {
            &self.network_mode
        } else {
            NO_NETWORK_MODE
        }
    }

    /// Engine spec for a container called `name`.
    pub fn to_container_spec(&self, name: impl Into<String>) -> ContainerSpec {
        ContainerSpec {
            name: name.into(),
            image: self.image.clone(),
            memory_limit: self.memory_limit.clone(),
            cpu_limit: self.cpu_limit,
            network_mode: self.effective_network_mode().to_string(),
        }
    }

    /// Reject settings no engine could satisfy.
    pub fn validate(&self) -> SandboxResult<()> {
        if self.image.trim().is_empty() {
            return Err(SandboxError::InvalidConfig("image reference is empty".into()));
        }
        if !is_memory_limit(&self.memory_limit) {
            return Err(SandboxError::InvalidConfig(format!(
                "memory limit {:?} is not a size like 512m, 1.5g or 2GiB",
                self.memory_limit
            )));
        }
        if !(self.cpu_limit.is_finite() && self.cpu_limit > 0.0) {
            return Err(SandboxError::InvalidConfig(format!(
                "cpu limit must be positive, got {}",
                self.cpu_limit
            )));
        }
        if self.time_budget.is_zero() {
            return Err(SandboxError::InvalidConfig("time budget is zero".into()));
        }
        Ok(())
    }
}

/// Size syntax the container engine accepts: a decimal number, then an
/// optional k/m/g/t/p unit with optional `i` and `b`, case-insensitive.
const MEMORY_LIMIT_PATTERN: &str = r"^\d+(\.\d+)?\s?[kKmMgGtTpP]?[iI]?[bB]?$";

fn is_memory_limit(s: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(MEMORY_LIMIT_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}
