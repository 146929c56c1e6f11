//! Invocation inputs and outputs: command vectors, staging maps, results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Program name followed by its arguments.
///
/// Opaque to the dispatcher: it is either spawned as-is (direct mode) or
/// shell-joined and run inside a container (sandbox mode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandVector(Vec<String>);

impl CommandVector {
    /// Start a vector with `program` and no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        CommandVector(vec![program.into()])
    }

    /// Append one argument (builder pattern).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.0.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn arguments(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Join into one POSIX-shell string, quoting arguments that need it.
    pub fn shell_join(&self) -> String {
        shell_words::join(&self.0)
    }
}

impl From<Vec<String>> for CommandVector {
    fn from(v: Vec<String>) -> Self {
        CommandVector(v)
    }
}

impl From<&[&str]> for CommandVector {
    fn from(v: &[&str]) -> Self {
        CommandVector(v.iter().map(|s| (*s).to_string()).collect())
    }
}

impl std::fmt::Display for CommandVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shell_join())
    }
}

/// Host path → container path pairs to stage before execution.
///
/// Host paths are unique; staging happens in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStagingMap {
    entries: Vec<(PathBuf, String)>,
}

impl FileStagingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `host_path` to `container_path`. Re-inserting an existing host
    /// path replaces its destination and keeps its original position.
    pub fn insert(&mut self, host_path: impl Into<PathBuf>, container_path: impl Into<String>) {
        let host_path = host_path.into();
        let container_path = container_path.into();
        match self.entries.iter_mut().find(|(h, _)| *h == host_path) {
            Some(entry) => entry.1 = container_path,
            None => self.entries.push((host_path, container_path)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        host_path: impl Into<PathBuf>,
        container_path: impl Into<String>,
    ) -> Self {
        self.insert(host_path, container_path);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries.iter().map(|(h, c)| (h.as_path(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<PathBuf>, C: Into<String>> FromIterator<(P, C)> for FileStagingMap {
    fn from_iter<T: IntoIterator<Item = (P, C)>>(iter: T) -> Self {
        let mut map = FileStagingMap::new();
        for (h, c) in iter {
            map.insert(h, c);
        }
        map
    }
}

/// The `(stdout, stderr)` pair every invocation produces.
///
/// An empty `stderr` means success. Failures never escape as errors; they
/// are folded into `stderr` with an empty `stdout`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Successful result carrying `stdout`.
    pub fn output(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "")
    }

    /// Returns `true` when stderr is empty.
    pub fn is_success(&self) -> bool {
        self.stderr.is_empty()
    }

    pub fn into_pair(self) -> (String, String) {
        (self.stdout, self.stderr)
    }
}

impl From<ExecutionError> for ExecutionResult {
    fn from(err: ExecutionError) -> Self {
        ExecutionResult::new("", err.to_string())
    }
}
