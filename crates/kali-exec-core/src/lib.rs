//! Kali Exec core: the execution dispatcher.
//!
//! Tool actions hand a [`CommandVector`] (and optionally a
//! [`FileStagingMap`]) to a [`CommandRunner`] and get back an
//! [`ExecutionResult`]. The runner either spawns the command on the host
//! or runs it inside a fresh, resource-bounded container through a
//! [`SandboxSession`], depending on the [`ExecutionMode`] it was built with.
//!
//! ## Layers
//!
//! - [`policy`] / [`catalogue`]: what each tool is allowed to use
//! - [`sandbox`]: container lifecycle on top of an [`IsolationEngine`]
//! - [`backend`]: direct and sandboxed execution strategies
//! - [`runner`] / [`dispatch`]: the entry points tool code calls
//!
//! [`IsolationEngine`]: isolation_engine::IsolationEngine

pub mod backend;
pub mod catalogue;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod policy;
pub mod runner;
pub mod sandbox;
pub mod telemetry;

pub use backend::{DirectBackend, ExecutionBackend, SandboxBackend};
pub use catalogue::{Action, ActionKind, ActionOptions, CatalogueError, Tool};
pub use command::{CommandVector, ExecutionResult, FileStagingMap};
pub use config::DispatchConfig;
pub use dispatch::ToolDispatcher;
pub use error::ExecutionError;
pub use policy::IsolationPolicy;
pub use runner::{CommandRunner, ExecutionMode};
pub use sandbox::{SandboxError, SandboxSession, SandboxSettings};
pub use telemetry::init_tracing;
