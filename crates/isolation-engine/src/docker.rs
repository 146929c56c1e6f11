//! Docker CLI engine
//!
//! Drives the `docker` client binary. Each operation is one client
//! invocation; the client process is killed if the calling future is
//! dropped, so an abandoned exec does not linger on the host.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine_traits::{ContainerId, ContainerSpec, EngineResult, IsolationEngine};
use crate::error::EngineError;

/// Isolation engine backed by the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    binary: String,
}

impl Default for DockerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerEngine {
    /// Engine using `docker` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Engine using a specific client binary (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        DockerEngine {
            binary: binary.into(),
        }
    }

    /// Check whether `image` is present in the local image store.
    pub async fn image_exists(&self, image: &str) -> EngineResult<bool> {
        let output = self.invoke(&["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    /// Arguments for `docker run` given a spec and the container name.
    ///
    /// Swap is pinned to the memory limit so the ceiling cannot be
    /// exceeded by paging out.
    pub fn run_args(spec: &ContainerSpec, name: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--detach".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--memory".to_string(),
            spec.memory_limit.clone(),
            "--memory-swap".to_string(),
            spec.memory_limit.clone(),
            "--cpus".to_string(),
            spec.cpu_limit.to_string(),
            "--network".to_string(),
            spec.network_mode.clone(),
            spec.image.clone(),
            "sleep".to_string(),
            "infinity".to_string(),
        ]
    }

    /// Arguments for `docker exec`; the shell folds stderr into stdout.
    pub fn exec_args(id: &ContainerId, command: &str) -> Vec<String> {
        vec![
            "exec".to_string(),
            id.as_str().to_string(),
            "sh".to_string(),
            "-c".to_string(),
            format!("exec 2>&1; {command}"),
        ]
    }

    async fn invoke<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> EngineResult<Output> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                binary: self.binary.clone(),
                source,
            })
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn ensure_success(operation: &'static str, output: &Output) -> EngineResult<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(EngineError::rejected(operation, stderr_of(output)))
    }
}

#[async_trait]
impl IsolationEngine for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn create(&self, spec: &ContainerSpec) -> EngineResult<ContainerId> {
        let name = if spec.name.is_empty() {
            ContainerSpec::unique_name()
        } else {
            spec.name.clone()
        };
        let output = self.invoke(&Self::run_args(spec, &name)).await?;
        ensure_success("create", &output)?;

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(EngineError::rejected(
                "create",
                "engine returned no container id",
            ));
        }
        let id = ContainerId::new(id);
        info!(container = %id.short(), image = %spec.image, network = %spec.network_mode, "container created");
        Ok(id)
    }

    async fn exec(&self, id: &ContainerId, command: &str) -> EngineResult<String> {
        debug!(container = %id.short(), command, "docker exec");
        let output = self.invoke(&Self::exec_args(id, command)).await?;

        // Program stderr is already merged into stdout inside the container,
        // so anything on the client's stderr came from the engine itself.
        if !output.status.success() && output.stdout.is_empty() && !output.stderr.is_empty() {
            return Err(EngineError::rejected("exec", stderr_of(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn put_file(
        &self,
        id: &ContainerId,
        host_path: &Path,
        container_path: &str,
    ) -> EngineResult<()> {
        if tokio::fs::metadata(host_path).await.is_err() {
            return Err(EngineError::HostFileNotFound(host_path.display().to_string()));
        }

        let target = format!("{}:{}", id.as_str(), container_path);
        let output = self
            .invoke(&[
                std::ffi::OsStr::new("cp"),
                host_path.as_os_str(),
                std::ffi::OsStr::new(&target),
            ])
            .await?;
        ensure_success("copy to container", &output)?;
        debug!(container = %id.short(), host = %host_path.display(), container_path, "file copied into container");
        Ok(())
    }

    async fn get_file(&self, id: &ContainerId, container_path: &str) -> EngineResult<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        let local = scratch.path().join("payload");
        let source = format!("{}:{}", id.as_str(), container_path);

        let output = self
            .invoke(&[
                std::ffi::OsStr::new("cp"),
                std::ffi::OsStr::new(&source),
                local.as_os_str(),
            ])
            .await?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if stderr.contains("Could not find the file")
                || stderr.contains("No such container:path")
            {
                return Err(EngineError::ContainerPathNotFound(container_path.to_string()));
            }
            return Err(EngineError::rejected("copy from container", stderr));
        }

        Ok(tokio::fs::read(&local).await?)
    }

    async fn stop_and_remove(&self, id: &ContainerId) -> EngineResult<()> {
        // `rm --force` kills and removes in one step; `sleep infinity` as PID 1
        // ignores SIGTERM, so a plain `stop` would always wait out its grace period.
        let output = self.invoke(&["rm", "--force", id.as_str()]).await?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if stderr.contains("No such container") {
                return Err(EngineError::UnknownContainer(id.to_string()));
            }
            return Err(EngineError::rejected("remove", stderr));
        }
        info!(container = %id.short(), "container removed");
        Ok(())
    }
}
