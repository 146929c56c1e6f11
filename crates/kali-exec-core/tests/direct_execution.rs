//! Direct-mode invocations spawn real host processes.

use std::sync::Arc;

use isolation_engine::fakes::MemoryEngine;
use kali_exec_core::{
    CommandRunner, CommandVector, DispatchConfig, ExecutionMode, ExecutionResult, FileStagingMap,
    IsolationPolicy, ToolDispatcher,
};

#[tokio::test]
async fn test_echo_hi() {
    let runner = CommandRunner::direct(IsolationPolicy::new("echo"));
    let result = runner.execute(CommandVector::new("echo").arg("hi"), None).await;
    assert_eq!(result, ExecutionResult::new("hi\n", ""));
}

#[tokio::test]
async fn test_input_files_are_ignored() {
    let runner = CommandRunner::direct(IsolationPolicy::new("echo"));
    let files = FileStagingMap::new().with("/does/not/exist", "/tmp/input_file");

    let with_files = runner
        .execute(CommandVector::new("echo").arg("same"), Some(files))
        .await;
    let without = runner.execute(CommandVector::new("echo").arg("same"), None).await;
    assert_eq!(with_files, without);
}

#[tokio::test]
async fn test_missing_binary_has_empty_stdout_and_message() {
    let runner = CommandRunner::direct(IsolationPolicy::new("ghost"));
    let result = runner
        .execute(CommandVector::new("kx-ghost-binary-that-does-not-exist"), None)
        .await;
    assert_eq!(result.stdout, "");
    assert!(!result.stderr.is_empty());
}

#[tokio::test]
async fn test_program_stderr_passes_through() {
    let runner = CommandRunner::direct(IsolationPolicy::new("sh"));
    let result = runner
        .execute(
            CommandVector::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]),
            None,
        )
        .await;
    assert_eq!(result, ExecutionResult::new("out\n", "err\n"));
}

#[tokio::test]
async fn test_direct_mode_never_touches_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let dispatcher = ToolDispatcher::new(DispatchConfig::default(), engine.clone());
    assert_eq!(dispatcher.mode(), ExecutionMode::Direct);

    let result = dispatcher
        .runner(IsolationPolicy::new("echo"))
        .execute(CommandVector::new("echo").arg("host"), None)
        .await;
    assert_eq!(result.stdout, "host\n");
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_env_config_selects_mode() {
    let config = DispatchConfig::from_lookup(|k| (k == "IS_SAFE").then(|| "TRUE".to_string()));
    assert_eq!(config.mode(), ExecutionMode::Sandboxed);

    let config = DispatchConfig::from_lookup(|k| (k == "IS_SAFE").then(|| "yes".to_string()));
    assert_eq!(config.mode(), ExecutionMode::Direct);
}
