//! End-to-end tests for sandboxed invocations against the in-memory engine.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use isolation_engine::fakes::{EngineCall, MemoryEngine};
use kali_exec_core::{CommandRunner, CommandVector, ExecutionResult, FileStagingMap, IsolationPolicy};

const IMAGE: &str = "kalilinux/kali-rolling";

fn runner(engine: &Arc<MemoryEngine>, policy: IsolationPolicy) -> CommandRunner {
    CommandRunner::sandboxed(policy, engine.clone(), IMAGE)
}

fn policy() -> IsolationPolicy {
    IsolationPolicy::new("test")
}

fn host_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

// -------------------------------------------------------------------------
// Results
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_success_is_combined_output_and_empty_stderr() {
    let engine = Arc::new(MemoryEngine::new());
    let result = runner(&engine, policy())
        .execute(CommandVector::new("echo").arg("hi"), None)
        .await;
    assert_eq!(result, ExecutionResult::output("hi\n"));
}

#[tokio::test]
async fn test_nonzero_program_exit_is_still_output() {
    let engine = Arc::new(MemoryEngine::new());
    let result = runner(&engine, policy())
        .execute(CommandVector::new("no-such-tool"), None)
        .await;
    assert_eq!(result.stdout, "sh: 1: no-such-tool: not found\n");
    assert!(result.is_success());
}

#[tokio::test]
async fn test_create_failure_reports_sandbox_error() {
    let engine = Arc::new(MemoryEngine::new().rejecting_create("pull access denied"));
    let result = runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;

    assert_eq!(result.stdout, "");
    assert!(result.stderr.starts_with("Sandbox execution error: "));
    assert!(result.stderr.contains("pull access denied"), "{}", result.stderr);
}

#[tokio::test]
async fn test_exec_failure_reports_sandbox_error() {
    let engine = Arc::new(MemoryEngine::new().rejecting_exec("daemon went away"));
    let result = runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;
    assert_eq!(result.stdout, "");
    assert!(result.stderr.starts_with("Sandbox execution error: "));
}

#[tokio::test(start_paused = true)]
async fn test_budget_of_one_second_against_ten_second_sleep_times_out() {
    let engine = Arc::new(MemoryEngine::new());
    let policy = policy().with_time_budget(Duration::from_secs(1));
    let result = runner(&engine, policy)
        .execute(CommandVector::new("sleep").arg("10"), None)
        .await;
    assert_eq!(
        result,
        ExecutionResult::new("", "Command execution timed out")
    );
}

#[tokio::test(start_paused = true)]
async fn test_budget_covers_slow_create() {
    let engine = Arc::new(MemoryEngine::new().with_create_delay(Duration::from_secs(5)));
    let policy = policy().with_time_budget(Duration::from_secs(2));
    let result = runner(&engine, policy)
        .execute(CommandVector::new("echo").arg("late"), None)
        .await;
    assert_eq!(result.stderr, "Command execution timed out");
    assert_single_lifecycle(&engine).await;
}

#[tokio::test(start_paused = true)]
async fn test_command_within_budget_completes() {
    let engine = Arc::new(MemoryEngine::new());
    let policy = policy().with_time_budget(Duration::from_secs(10));
    let result = runner(&engine, policy)
        .execute(CommandVector::new("sleep").arg("1"), None)
        .await;
    assert_eq!(result, ExecutionResult::output(""));
}

#[tokio::test]
async fn test_empty_command_matches_direct_mode() {
    let engine = Arc::new(MemoryEngine::new());
    let sandboxed = runner(&engine, policy())
        .execute(CommandVector::default(), None)
        .await;
    let direct = CommandRunner::direct(policy())
        .execute(CommandVector::default(), None)
        .await;

    assert_eq!(sandboxed, ExecutionResult::new("", "empty command vector"));
    assert_eq!(sandboxed, direct);
    assert_eq!(engine.created_count(), 0);
}

#[tokio::test]
async fn test_engine_panic_is_unknown_error() {
    let engine = Arc::new(MemoryEngine::new().panicking_on_exec());
    let result = runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;
    assert_eq!(result.stdout, "");
    assert!(result.stderr.starts_with("Unknown error: "), "{}", result.stderr);
}

// -------------------------------------------------------------------------
// Cleanup invariant: exactly one create and one removal per call
// -------------------------------------------------------------------------

async fn assert_single_lifecycle(engine: &MemoryEngine) {
    settle().await;
    assert_eq!(engine.created_count(), 1);
    assert_eq!(engine.removed_count(), 1);
    assert_eq!(engine.live_count(), 0);
}

#[tokio::test]
async fn test_cleanup_once_on_success() {
    let engine = Arc::new(MemoryEngine::new());
    runner(&engine, policy())
        .execute(CommandVector::new("echo").arg("ok"), None)
        .await;
    assert_single_lifecycle(&engine).await;
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_once_on_timeout() {
    let engine = Arc::new(MemoryEngine::new());
    let policy = policy().with_time_budget(Duration::from_secs(1));
    runner(&engine, policy)
        .execute(CommandVector::new("sleep").arg("10"), None)
        .await;
    assert_single_lifecycle(&engine).await;
}

#[tokio::test]
async fn test_cleanup_once_on_exec_failure() {
    let engine = Arc::new(MemoryEngine::new().rejecting_exec("boom"));
    runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;
    assert_single_lifecycle(&engine).await;
}

#[tokio::test]
async fn test_cleanup_once_on_staging_failure() {
    let engine = Arc::new(MemoryEngine::new().rejecting_put("/tmp/b", "no space left"));
    let a = host_file("a");
    let b = host_file("b");
    let files = FileStagingMap::new()
        .with(a.path(), "/tmp/a")
        .with(b.path(), "/tmp/b")
        .with("/never/reached", "/tmp/c");

    let result = runner(&engine, policy())
        .execute(CommandVector::new("cat").arg("/tmp/a"), Some(files))
        .await;

    assert!(result.stderr.starts_with("Sandbox execution error: "));
    assert_eq!(engine.staged_paths(), ["/tmp/a", "/tmp/b"]);
    assert!(!engine.calls().iter().any(|c| matches!(c, EngineCall::Exec { .. })));
    assert_single_lifecycle(&engine).await;
}

#[tokio::test]
async fn test_cleanup_once_on_panic() {
    let engine = Arc::new(MemoryEngine::new().panicking_on_exec());
    runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;
    assert_single_lifecycle(&engine).await;
}

#[tokio::test]
async fn test_no_removal_when_create_fails() {
    let engine = Arc::new(MemoryEngine::new().rejecting_create("bad image"));
    runner(&engine, policy())
        .execute(CommandVector::new("true"), None)
        .await;
    settle().await;
    assert_eq!(engine.created_count(), 1);
    assert_eq!(engine.removed_count(), 0);
    assert_eq!(engine.live_count(), 0);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_change_result() {
    let engine = Arc::new(MemoryEngine::new().rejecting_remove("device busy"));
    let result = runner(&engine, policy())
        .execute(CommandVector::new("echo").arg("kept"), None)
        .await;
    assert_eq!(result, ExecutionResult::output("kept\n"));
    assert_eq!(engine.removed_count(), 1);
}

// -------------------------------------------------------------------------
// Staging
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_staged_file_is_readable_by_command() {
    let engine = Arc::new(MemoryEngine::new());
    let input = host_file("ELF\x7fsecret-string\n");
    let files = FileStagingMap::new().with(input.path(), "/tmp/input_file");

    let result = runner(&engine, policy())
        .execute(CommandVector::new("cat").arg("/tmp/input_file"), Some(files))
        .await;
    assert_eq!(result, ExecutionResult::output("ELF\x7fsecret-string\n"));
}

#[tokio::test]
async fn test_staging_preserves_insertion_order() {
    let engine = Arc::new(MemoryEngine::new());
    let a = host_file("a");
    let b = host_file("b");
    let files = FileStagingMap::new()
        .with(a.path(), "/x")
        .with(b.path(), "/y");

    runner(&engine, policy())
        .execute(CommandVector::new("true"), Some(files))
        .await;

    let kinds: Vec<&'static str> = engine
        .calls()
        .iter()
        .map(|c| match c {
            EngineCall::Create(_) => "create",
            EngineCall::PutFile { .. } => "put",
            EngineCall::Exec { .. } => "exec",
            EngineCall::GetFile { .. } => "get",
            EngineCall::StopAndRemove(_) => "remove",
        })
        .collect();
    assert_eq!(kinds, ["create", "put", "put", "exec", "remove"]);
    assert_eq!(engine.staged_paths(), ["/x", "/y"]);
}

// -------------------------------------------------------------------------
// Resource settings and concurrency
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_policy_limits_reach_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let policy = IsolationPolicy::new("nmap")
        .with_network(true)
        .with_memory_limit("2g")
        .with_cpu_limit(0.5);
    runner(&engine, policy)
        .execute(CommandVector::new("true"), None)
        .await;

    let spec = &engine.created_specs()[0];
    assert_eq!(spec.image, IMAGE);
    assert_eq!(spec.memory_limit, "2g");
    assert_eq!(spec.cpu_limit, 0.5);
    assert_eq!(spec.network_mode, "bridge");
}

#[tokio::test]
async fn test_network_disabled_policy_gets_no_network() {
    let engine = Arc::new(MemoryEngine::new());
    runner(&engine, IsolationPolicy::new("nm"))
        .execute(CommandVector::new("true"), None)
        .await;
    assert_eq!(engine.created_specs()[0].network_mode, "none");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_each_own_a_container() {
    let engine = Arc::new(MemoryEngine::new().with_exec_delay(Duration::from_millis(20)));
    let runner = runner(&engine, policy());

    let calls = (0..8).map(|i| {
        let runner = runner.clone();
        async move {
            runner
                .execute(CommandVector::new("echo").arg(format!("call-{i}")), None)
                .await
        }
    });
    let results = futures::future::join_all(calls).await;

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.stdout, format!("call-{i}\n"));
    }

    let exec_ids: HashSet<String> = engine
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            EngineCall::Exec { id, .. } => Some(id.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(exec_ids.len(), 8);
    assert_eq!(engine.created_count(), 8);
    assert_eq!(engine.removed_count(), 8);
    assert_eq!(engine.live_count(), 0);
}
