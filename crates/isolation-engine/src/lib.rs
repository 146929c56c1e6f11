//! Isolation-Engine: Container Capability Interface for Kali Exec
//!
//! This crate is the only place that knows how isolated environments are
//! actually provisioned. The dispatcher above it depends on five operations
//! and nothing else.
//!
//! ## Layer 0 - Isolation
//!
//! Focus: create, exec, copy in, copy out, stop-and-remove.
//!
//! ## Key Components
//!
//! - `IsolationEngine`: the capability trait
//! - `DockerEngine`: production implementation driving the `docker` CLI
//! - `fakes::MemoryEngine`: scriptable in-memory engine for tests

pub mod docker;
pub mod engine_traits;
mod error;
pub mod fakes;

pub use docker::DockerEngine;
pub use engine_traits::{ContainerId, ContainerSpec, EngineResult, IsolationEngine};
pub use error::EngineError;
