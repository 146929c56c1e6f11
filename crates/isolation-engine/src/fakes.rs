//! In-memory fake engine (testing only)
//!
//! `MemoryEngine` keeps containers as maps of path → bytes and understands a
//! handful of commands (`echo`, `cat`, `sleep`). Failures, delays and panics
//! can be scripted per operation, and every call is recorded so tests can
//! assert on lifecycle ordering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine_traits::{ContainerId, ContainerSpec, EngineResult, IsolationEngine};
use crate::error::EngineError;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create(ContainerSpec),
    Exec {
        id: ContainerId,
        command: String,
    },
    PutFile {
        id: ContainerId,
        host_path: PathBuf,
        container_path: String,
    },
    GetFile {
        id: ContainerId,
        container_path: String,
    },
    StopAndRemove(ContainerId),
}

#[derive(Debug, Default, Clone)]
struct Script {
    create_delay: Option<Duration>,
    exec_delay: Option<Duration>,
    reject_create: Option<String>,
    reject_exec: Option<String>,
    reject_put: Option<(String, String)>,
    reject_remove: Option<String>,
    panic_on_exec: bool,
    exec_output: Option<String>,
}

#[derive(Debug)]
struct FakeContainer {
    spec: ContainerSpec,
    files: HashMap<String, Vec<u8>>,
}

/// In-memory isolation engine backed by a `HashMap<id, container>`.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    containers: Mutex<HashMap<ContainerId, FakeContainer>>,
    calls: Mutex<Vec<EngineCall>>,
    next_id: AtomicU64,
    script: Script,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `create` with `reason`.
    pub fn rejecting_create(mut self, reason: impl Into<String>) -> Self {
        self.script.reject_create = Some(reason.into());
        self
    }

    /// Fail every `exec` with `reason`.
    pub fn rejecting_exec(mut self, reason: impl Into<String>) -> Self {
        self.script.reject_exec = Some(reason.into());
        self
    }

    /// Fail `put_file` for one destination path.
    pub fn rejecting_put(
        mut self,
        container_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        self.script.reject_put = Some((container_path.into(), reason.into()));
        self
    }

    /// Fail every `stop_and_remove` with `reason`; the container stays live.
    pub fn rejecting_remove(mut self, reason: impl Into<String>) -> Self {
        self.script.reject_remove = Some(reason.into());
        self
    }

    /// Delay the reply to `create` by `delay` (tokio time, so paused clocks
    /// apply). The container is registered before the delay starts.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.script.create_delay = Some(delay);
        self
    }

    /// Delay every `exec` by `delay`.
    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.script.exec_delay = Some(delay);
        self
    }

    /// Panic inside `exec`.
    pub fn panicking_on_exec(mut self) -> Self {
        self.script.panic_on_exec = true;
        self
    }

    /// Output returned for programs the fake does not interpret.
    pub fn with_exec_output(mut self, output: impl Into<String>) -> Self {
        self.script.exec_output = Some(output.into());
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Create(_)))
    }

    pub fn removed_count(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::StopAndRemove(_)))
    }

    /// Containers that were created and not yet removed.
    pub fn live_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    /// Specs of all `create` calls.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Create(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    /// Destination paths of `put_file` calls, in order.
    pub fn staged_paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::PutFile { container_path, .. } => Some(container_path),
                _ => None,
            })
            .collect()
    }

    /// Seed a file directly into a live container.
    pub fn seed_file(
        &self,
        id: &ContainerId,
        container_path: &str,
        data: &[u8],
    ) -> EngineResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownContainer(id.to_string()))?;
        container.files.insert(container_path.to_string(), data.to_vec());
        Ok(())
    }

    fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn read_file(&self, id: &ContainerId, container_path: &str) -> EngineResult<Option<Vec<u8>>> {
        let containers = self.containers.lock().unwrap();
        let container = containers
            .get(id)
            .ok_or_else(|| EngineError::UnknownContainer(id.to_string()))?;
        Ok(container.files.get(container_path).cloned())
    }

    async fn interpret(&self, id: &ContainerId, command: &str) -> EngineResult<String> {
        let words = shell_words::split(command)
            .map_err(|e| EngineError::rejected("exec", format!("unparsable command: {e}")))?;
        let Some((program, args)) = words.split_first() else {
            return Ok(String::new());
        };

        match program.as_str() {
            "echo" => Ok(format!("{}\n", args.join(" "))),
            "cat" => {
                let mut out = String::new();
                for path in args {
                    match self.read_file(id, path)? {
                        Some(data) => out.push_str(&String::from_utf8_lossy(&data)),
                        None => out.push_str(&format!("cat: {path}: No such file or directory\n")),
                    }
                }
                Ok(out)
            }
            "sleep" => {
                let secs: f64 = args.first().and_then(|s| s.parse().ok()).unwrap_or(0.0);
                let duration = Duration::try_from_secs_f64(secs).unwrap_or_default();
                tokio::time::sleep(duration).await;
                Ok(String::new())
            }
            other => Ok(self
                .script
                .exec_output
                .clone()
                .unwrap_or_else(|| format!("sh: 1: {other}: not found\n"))),
        }
    }
}

#[async_trait]
impl IsolationEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, spec: &ContainerSpec) -> EngineResult<ContainerId> {
        self.record(EngineCall::Create(spec.clone()));
        if let Some(reason) = &self.script.reject_create {
            return Err(EngineError::rejected("create", reason.clone()));
        }
        if spec.image.is_empty() {
            return Err(EngineError::rejected("create", "invalid reference format"));
        }

        let id = if spec.name.is_empty() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            ContainerId::new(format!("fake-{n:06}"))
        } else {
            ContainerId::new(spec.name.clone())
        };
        {
            let mut containers = self.containers.lock().unwrap();
            if containers.contains_key(&id) {
                return Err(EngineError::rejected(
                    "create",
                    format!("Conflict. The container name \"/{id}\" is already in use"),
                ));
            }
            containers.insert(
                id.clone(),
                FakeContainer {
                    spec: spec.clone(),
                    files: HashMap::new(),
                },
            );
        }

        // Like a real daemon, the container exists before the caller hears
        // back; a caller that gives up during the delay must remove it by name.
        if let Some(delay) = self.script.create_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(id)
    }

    async fn exec(&self, id: &ContainerId, command: &str) -> EngineResult<String> {
        self.record(EngineCall::Exec {
            id: id.clone(),
            command: command.to_string(),
        });
        if !self.containers.lock().unwrap().contains_key(id) {
            return Err(EngineError::UnknownContainer(id.to_string()));
        }
        if let Some(delay) = self.script.exec_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.panic_on_exec {
            panic!("scripted engine panic");
        }
        if let Some(reason) = &self.script.reject_exec {
            return Err(EngineError::rejected("exec", reason.clone()));
        }
        self.interpret(id, command).await
    }

    async fn put_file(
        &self,
        id: &ContainerId,
        host_path: &Path,
        container_path: &str,
    ) -> EngineResult<()> {
        self.record(EngineCall::PutFile {
            id: id.clone(),
            host_path: host_path.to_path_buf(),
            container_path: container_path.to_string(),
        });
        if let Some((path, reason)) = &self.script.reject_put {
            if path == container_path {
                return Err(EngineError::rejected("copy to container", reason.clone()));
            }
        }
        let data = tokio::fs::read(host_path)
            .await
            .map_err(|_| EngineError::HostFileNotFound(host_path.display().to_string()))?;
        self.seed_file(id, container_path, &data)
    }

    async fn get_file(&self, id: &ContainerId, container_path: &str) -> EngineResult<Vec<u8>> {
        self.record(EngineCall::GetFile {
            id: id.clone(),
            container_path: container_path.to_string(),
        });
        self.read_file(id, container_path)?
            .ok_or_else(|| EngineError::ContainerPathNotFound(container_path.to_string()))
    }

    async fn stop_and_remove(&self, id: &ContainerId) -> EngineResult<()> {
        self.record(EngineCall::StopAndRemove(id.clone()));
        if let Some(reason) = &self.script.reject_remove {
            return Err(EngineError::rejected("remove", reason.clone()));
        }
        let removed = self.containers.lock().unwrap().remove(id);
        match removed {
            Some(container) => {
                tracing::debug!(container = %id, image = %container.spec.image, "fake container removed");
                Ok(())
            }
            None => Err(EngineError::UnknownContainer(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: String::new(),
            image: "kalilinux/kali-rolling".into(),
            memory_limit: "1g".into(),
            cpu_limit: 1.0,
            network_mode: "none".into(),
        }
    }

    #[tokio::test]
    async fn test_echo_and_cat() {
        let engine = MemoryEngine::new();
        let id = engine.create(&spec()).await.unwrap();
        engine.seed_file(&id, "/tmp/a", b"alpha").unwrap();

        assert_eq!(engine.exec(&id, "echo hi there").await.unwrap(), "hi there\n");
        assert_eq!(engine.exec(&id, "cat /tmp/a").await.unwrap(), "alpha");
        assert!(engine
            .exec(&id, "cat /tmp/missing")
            .await
            .unwrap()
            .contains("No such file"));
    }

    #[tokio::test]
    async fn test_unknown_program_uses_scripted_output() {
        let engine = MemoryEngine::new().with_exec_output("PORT STATE\n");
        let id = engine.create(&spec()).await.unwrap();
        assert_eq!(engine.exec(&id, "nmap -F host").await.unwrap(), "PORT STATE\n");
    }

    #[tokio::test]
    async fn test_remove_twice_is_unknown_container() {
        let engine = MemoryEngine::new();
        let id = engine.create(&spec()).await.unwrap();
        engine.stop_and_remove(&id).await.unwrap();
        let err = engine.stop_and_remove(&id).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownContainer(_)));
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.removed_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let engine = MemoryEngine::new();
        let mut bad = spec();
        bad.image.clear();
        let err = engine.create(&bad).await.unwrap_err();
        assert!(err.to_string().contains("invalid reference format"));
        assert_eq!(engine.live_count(), 0);
    }

    #[tokio::test]
    async fn test_sleep_with_unrepresentable_duration_returns() {
        let engine = MemoryEngine::new();
        let id = engine.create(&spec()).await.unwrap();
        for arg in ["-1", "inf", "NaN", "soon"] {
            let out = engine.exec(&id, &format!("sleep {arg}")).await.unwrap();
            assert_eq!(out, "");
        }
    }

    #[tokio::test]
    async fn test_named_container_uses_name_as_id() {
        let engine = MemoryEngine::new();
        let named = ContainerSpec {
            name: "kali-exec-named".into(),
            ..spec()
        };
        let id = engine.create(&named).await.unwrap();
        assert_eq!(id.as_str(), "kali-exec-named");

        let err = engine.create(&named).await.unwrap_err();
        assert!(err.to_string().contains("already in use"));
        assert_eq!(engine.live_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_create_registers_before_reply() {
        let engine = MemoryEngine::new().with_create_delay(Duration::from_secs(5));
        let named = ContainerSpec {
            name: "kali-exec-slow".into(),
            ..spec()
        };
        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), engine.create(&named)).await;
        assert!(abandoned.is_err());
        assert_eq!(engine.live_count(), 1);

        engine
            .stop_and_remove(&ContainerId::new("kali-exec-slow"))
            .await
            .unwrap();
        assert_eq!(engine.live_count(), 0);
    }
}
