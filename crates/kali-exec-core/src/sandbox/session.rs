//! Sandbox session: owns one container from creation to removal.
//!
//! A session is created per invocation and never shared. It moves through
//! `create → [copy_to_container]* → run_command → cleanup`; `cleanup` is
//! idempotent and never fails, and a session dropped while its container
//! is still live schedules a best-effort removal on the current runtime.
//!
//! The container name is picked before `create` is awaited. If that await is
//! abandoned (e.g. the time budget expires during an image pull), the name
//! stays pending and `cleanup` removes the container by name.

use std::path::Path;
use std::sync::Arc;

use isolation_engine::{ContainerId, ContainerSpec, EngineError, IsolationEngine};
use tracing::{debug, info, warn};

use super::error::{SandboxError, SandboxResult};
use super::settings::SandboxSettings;

/// Lifecycle manager for a single isolated environment.
pub struct SandboxSession {
    engine: Arc<dyn IsolationEngine>,
    container: Option<ContainerId>,
    /// Name of a container whose `create` was started but never answered.
    pending: Option<ContainerId>,
}

impl std::fmt::Debug for SandboxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxSession")
            .field("engine", &self.engine.name())
            .field("container", &self.container)
            .field("pending", &self.pending)
            .finish()
    }
}

impl SandboxSession {
    pub fn new(engine: Arc<dyn IsolationEngine>) -> Self {
        Self {
            engine,
            container: None,
            pending: None,
        }
    }

    /// The live container, if any.
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.container.is_some()
    }

    /// Whether a `create` was abandoned before the engine answered.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take whatever may exist engine-side: the live container, else the
    /// name of an abandoned create. The flag is `true` for the latter.
    fn take_handle(&mut self) -> Option<(ContainerId, bool)> {
        match (self.container.take(), self.pending.take()) {
            (Some(id), _) => Some((id, false)),
            (None, Some(name)) => Some((name, true)),
            (None, None) => None,
        }
    }

    fn live(&self) -> SandboxResult<&ContainerId> {
        self.container.as_ref().ok_or(SandboxError::NotCreated)
    }

    /// Provision and start the environment.
    ///
    /// Settings are validated before the engine is contacted. A second
    /// `create` on a live session is refused rather than leaking the first
    /// container.
    pub async fn create(&mut self, settings: &SandboxSettings) -> SandboxResult<()> {
        if let Some(existing) = self.container.as_ref().or(self.pending.as_ref()) {
            return Err(SandboxError::AlreadyCreated(existing.to_string()));
        }
        settings.validate()?;

        let spec = settings.to_container_spec(ContainerSpec::unique_name());
        self.pending = Some(ContainerId::new(spec.name.clone()));
        let created = self.engine.create(&spec).await;
        self.pending = None;
        let id = created.map_err(SandboxError::Create)?;
        info!(
            container = %id.short(),
            image = %spec.image,
            memory = %spec.memory_limit,
            cpus = spec.cpu_limit,
            network = %spec.network_mode,
            "sandbox created"
        );
        self.container = Some(id);
        Ok(())
    }

    /// Run a shell string inside the environment and return its combined
    /// output. A non-zero exit of the program is not an error.
    pub async fn run_command(&self, command: &str) -> SandboxResult<String> {
        let id = self.live()?;
        debug!(container = %id.short(), command, "running command in sandbox");
        self.engine
            .exec(id, command)
            .await
            .map_err(SandboxError::Exec)
    }

    /// Copy a host file to `container_path` inside the environment.
    pub async fn copy_to_container(&self, host_path: &Path, container_path: &str) -> SandboxResult<()> {
        let id = self.live()?;
        self.engine
            .put_file(id, host_path, container_path)
            .await
            .map_err(SandboxError::CopyIn)?;
        debug!(container = %id.short(), host = %host_path.display(), container_path, "file staged");
        Ok(())
    }

    /// Copy `container_path` out to `dest_path` on the host, creating any
    /// missing parent directories.
    pub async fn copy_from_container(&self, container_path: &str, dest_path: &Path) -> SandboxResult<()> {
        let id = self.live()?;
        let data = self
            .engine
            .get_file(id, container_path)
            .await
            .map_err(SandboxError::CopyOut)?;

        let write_err = |source: std::io::Error| SandboxError::WriteLocal {
            path: dest_path.display().to_string(),
            source,
        };
        if let Some(parent) = dest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(dest_path, &data).await.map_err(write_err)?;
        debug!(container = %id.short(), container_path, dest = %dest_path.display(), bytes = data.len(), "file retrieved");
        Ok(())
    }

    /// Stop and remove the environment. No-op when nothing is live or
    /// pending.
    ///
    /// Failures are logged and swallowed: cleanup must never replace the
    /// result of the invocation it follows.
    pub async fn cleanup(&mut self) {
        let Some((id, abandoned)) = self.take_handle() else {
            return;
        };
        match self.engine.stop_and_remove(&id).await {
            Ok(()) if abandoned => info!(container = %id, "abandoned sandbox removed"),
            Ok(()) => info!(container = %id.short(), "sandbox cleaned up"),
            Err(EngineError::UnknownContainer(_)) if abandoned => {
                debug!(container = %id, "abandoned create left no container")
            }
            Err(e) => warn!(container = %id.short(), error = %e, "sandbox cleanup failed"),
        }
    }
}

impl Drop for SandboxSession {
    fn drop(&mut self) {
        let Some((id, _)) = self.take_handle() else {
            return;
        };
        warn!(container = %id.short(), "sandbox session dropped while live, scheduling removal");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = Arc::clone(&self.engine);
                handle.spawn(async move {
                    if let Err(e) = engine.stop_and_remove(&id).await {
                        warn!(container = %id.short(), error = %e, "deferred sandbox removal failed");
                    }
                });
            }
            Err(_) => warn!(container = %id.short(), "no runtime available, container leaked"),
        }
    }
}
