//! Isolation engine trait definitions
//!
//! `IsolationEngine` covers the full lifetime of one environment:
//! - `create`: provision and start a container with hard resource limits
//! - `exec`: run a shell string inside it, returning combined output
//! - `put_file` / `get_file`: move single files across the boundary
//! - `stop_and_remove`: tear it down
//!
//! The trait is async and engine-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine-assigned identifier of a running container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        ContainerId(id.into())
    }

    /// Return the full identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 chars), as engines print it.
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(12)
            .map_or(&self.0[..], |(i, _)| &self.0[..i])
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefix of container names handed out by [`ContainerSpec::unique_name`].
pub const CONTAINER_PREFIX: &str = "kali-exec";

/// Everything the engine needs to provision one container.
///
/// Memory and CPU are hard limits of the engine, not hints. The name is
/// chosen by the caller before `create` is awaited, so a container whose
/// creation was abandoned can still be removed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name; engines generate one when empty
    #[serde(default)]
    pub name: String,
    /// Image reference (e.g. "kalilinux/kali-rolling")
    pub image: String,
    /// Memory ceiling in engine notation (e.g. "1g", "512m")
    pub memory_limit: String,
    /// Fraction of CPUs (1.0 = one full core)
    pub cpu_limit: f64,
    /// Network mode; "none" means no network at all
    pub network_mode: String,
}

impl ContainerSpec {
    /// A fresh `kali-exec-<uuid>` name.
    pub fn unique_name() -> String {
        format!("{}-{}", CONTAINER_PREFIX, uuid::Uuid::new_v4())
    }

    /// CPU limit expressed in billionths of a CPU.
    pub fn nano_cpus(&self) -> u64 {
        (self.cpu_limit * 1e9) as u64
    }

    /// Whether the container gets any network at all.
    pub fn has_network(&self) -> bool {
        self.network_mode != "none"
    }
}

/// Capability interface over a container engine.
///
/// Guarantees:
/// - `exec` reports a non-zero exit of the executed program as normal output,
///   never as an error.
/// - `stop_and_remove` on a removed container fails with `UnknownContainer`.
/// - `stop_and_remove` accepts the spec's name as well as the returned id.
#[async_trait]
pub trait IsolationEngine: Send + Sync {
    /// Human-readable engine name (e.g. "docker", "memory").
    fn name(&self) -> &'static str;

    /// Provision and start a container.
    async fn create(&self, spec: &ContainerSpec) -> EngineResult<ContainerId>;

    /// Run `command` through a shell inside the container; stdout and stderr
    /// of the program come back interleaved as one string.
    async fn exec(&self, id: &ContainerId, command: &str) -> EngineResult<String>;

    /// Copy a host file to `container_path` inside the container.
    async fn put_file(
        &self,
        id: &ContainerId,
        host_path: &Path,
        container_path: &str,
    ) -> EngineResult<()>;

    /// Read a file out of the container.
    async fn get_file(&self, id: &ContainerId, container_path: &str) -> EngineResult<Vec<u8>>;

    /// Stop the container and remove it.
    async fn stop_and_remove(&self, id: &ContainerId) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(network_mode: &str) -> ContainerSpec {
        ContainerSpec {
            name: "kali-exec-test".into(),
            image: "kalilinux/kali-rolling".into(),
            memory_limit: "1g".into(),
            cpu_limit: 0.5,
            network_mode: network_mode.into(),
        }
    }

    #[test]
    fn test_container_id_short() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(ContainerId::new("abc").short(), "abc");
    }

    #[test]
    fn test_container_id_short_multibyte() {
        let id = ContainerId::new("ééééééééééééééé");
        assert_eq!(id.short(), "éééééééééééé");
        assert_eq!(ContainerId::new("naïve").short(), "naïve");
    }

    #[test]
    fn test_unique_names_are_prefixed_and_distinct() {
        let a = ContainerSpec::unique_name();
        let b = ContainerSpec::unique_name();
        assert!(a.starts_with("kali-exec-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_nano_cpus() {
        assert_eq!(spec("bridge").nano_cpus(), 500_000_000);
    }

    #[test]
    fn test_has_network() {
        assert!(spec("bridge").has_network());
        assert!(!spec("none").has_network());
    }
}
