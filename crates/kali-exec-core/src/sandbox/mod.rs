//! Sandbox lifecycle for containerised tool runs.
//!
//! - [`SandboxSettings`]: image, limits and network derived from a policy
//! - [`SandboxSession`]: one container, created, used and removed
//! - [`SandboxError`]: failures surfaced by a session

pub mod error;
pub mod session;
pub mod settings;

pub use error::{SandboxError, SandboxResult};
pub use session::SandboxSession;
pub use settings::{SandboxSettings, DEFAULT_IMAGE, DEFAULT_NETWORK_MODE, NO_NETWORK_MODE};
