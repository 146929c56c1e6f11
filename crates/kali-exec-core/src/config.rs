//! Process-wide dispatch configuration.

use serde::{Deserialize, Serialize};

use crate::runner::ExecutionMode;
use crate::sandbox::DEFAULT_IMAGE;

/// Turns sandboxed execution on when set to `true` (any case).
pub const SAFE_MODE_VAR: &str = "IS_SAFE";
/// Overrides the sandbox base image.
pub const IMAGE_VAR: &str = "KALI_IMAGE";

/// Settings read once at start-up and shared by every runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub safe_mode: bool,
    pub image: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            image: DEFAULT_IMAGE.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Load from `IS_SAFE` and `KALI_IMAGE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let safe_mode = lookup(SAFE_MODE_VAR)
            .map(|v| parse_safe_flag(&v))
            .unwrap_or(false);
        let image = lookup(IMAGE_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
        Self { safe_mode, image }
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_safe_mode(self.safe_mode)
    }
}

/// Only the literal `true`, ignoring ASCII case, enables safe mode.
pub fn parse_safe_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}
