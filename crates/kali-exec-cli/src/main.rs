//! Kali Exec - run security tooling directly or in throwaway containers
//!
//! ## Commands
//!
//! - `run`: run a catalogued action against a target
//! - `exec`: run an arbitrary command under a tool's isolation policy
//! - `tools`: list the catalogue and its policies
//!
//! Sandboxing is enabled with `--safe` or `IS_SAFE=true`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use isolation_engine::DockerEngine;
use kali_exec_core::{
    Action, ActionKind, ActionOptions, CommandVector, DispatchConfig, ExecutionMode,
    ExecutionResult, FileStagingMap, Tool, ToolDispatcher,
};
use serde::Serialize;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "kali-exec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Kali tooling on the host or in isolated containers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON (results and log lines)
    #[arg(long, global = true)]
    json: bool,

    /// Force sandboxed execution (also enabled by IS_SAFE=true)
    #[arg(long, global = true)]
    safe: bool,

    /// Sandbox base image (checked locally before use)
    #[arg(long, global = true, value_name = "IMAGE")]
    kali_image: Option<String>,

    /// Container engine binary
    #[arg(long, global = true, env = "KALI_EXEC_DOCKER", default_value = "docker")]
    docker: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a catalogued action (see `tools`)
    Run {
        /// Action name, e.g. nmap-quick or strings-min-length
        action: String,

        /// Host, binary, pcap file or interface, depending on the action
        target: String,

        #[command(flatten)]
        options: OptionArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Run an arbitrary command under a tool's isolation policy
    Exec {
        /// Tool whose policy applies
        #[arg(long)]
        tool: String,

        #[command(flatten)]
        staging: StagingArgs,

        /// Program and arguments
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// List catalogued tools, their policies and actions
    Tools,
}

#[derive(Args, Default)]
struct OptionArgs {
    /// objdump section to disassemble
    #[arg(long)]
    section: Option<String>,

    /// strings minimum length
    #[arg(long)]
    min_length: Option<u32>,

    /// strings offset radix (d, o, x)
    #[arg(long)]
    radix: Option<String>,

    /// strings encoding (s, S, b, l)
    #[arg(long)]
    encoding: Option<String>,

    /// tshark capture duration in seconds
    #[arg(long = "duration")]
    duration_secs: Option<u32>,

    /// tshark capture or display filter
    #[arg(long)]
    filter: Option<String>,
}

impl From<OptionArgs> for ActionOptions {
    fn from(a: OptionArgs) -> Self {
        ActionOptions {
            section: a.section,
            min_length: a.min_length,
            radix: a.radix,
            encoding: a.encoding,
            duration_secs: a.duration_secs,
            filter: a.filter,
        }
    }
}

#[derive(Args, Default)]
struct StagingArgs {
    /// Copy a host file into the sandbox before running (HOST=CONTAINER)
    #[arg(long = "stage", value_name = "HOST=CONTAINER", value_parser = parse_stage)]
    stage: Vec<(PathBuf, String)>,
}

impl StagingArgs {
    fn into_map(self) -> Option<FileStagingMap> {
        if self.stage.is_empty() {
            None
        } else {
            Some(self.stage.into_iter().collect())
        }
    }
}

fn parse_stage(s: &str) -> std::result::Result<(PathBuf, String), String> {
    let (host, container) = s
        .split_once('=')
        .ok_or_else(|| format!("expected HOST=CONTAINER, got {s:?}"))?;
    if host.is_empty() || container.is_empty() {
        return Err(format!("expected HOST=CONTAINER, got {s:?}"));
    }
    if !container.starts_with('/') {
        return Err(format!("container path must be absolute: {container:?}"));
    }
    Ok((PathBuf::from(host), container.to_string()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    kali_exec_core::init_tracing(cli.json, level);

    let mut config = DispatchConfig::from_env();
    if cli.safe {
        config = config.with_safe_mode(true);
    }
    if let Some(image) = &cli.kali_image {
        config = config.with_image(image.clone());
    }
    debug!(mode = %config.mode(), image = %config.image, "dispatch configured");

    let engine = DockerEngine::with_binary(cli.docker.clone());

    match cli.command {
        Commands::Tools => cmd_tools(cli.json),
        Commands::Run {
            action,
            target,
            options,
            staging,
        } => {
            let action = Action::parse(&action, target, options.into())
                .context("Run `kali-exec tools` for the list of actions")?;
            preflight(&engine, &config, cli.kali_image.is_some()).await?;
            let dispatcher = ToolDispatcher::new(config, Arc::new(engine));
            let result = dispatcher.run_action(&action, staging.into_map()).await;
            Ok(report(&result, cli.json))
        }
        Commands::Exec {
            tool,
            staging,
            command,
        } => {
            let tool = Tool::from_name(&tool).context("Unknown --tool")?;
            preflight(&engine, &config, cli.kali_image.is_some()).await?;
            let dispatcher = ToolDispatcher::new(config, Arc::new(engine));
            let result = dispatcher
                .runner_for(tool)
                .execute(CommandVector::from(command), staging.into_map())
                .await;
            Ok(report(&result, cli.json))
        }
    }
}

/// Check that an explicitly chosen image is present before sandboxing.
async fn preflight(engine: &DockerEngine, config: &DispatchConfig, explicit_image: bool) -> Result<()> {
    if !explicit_image || config.mode() != ExecutionMode::Sandboxed {
        return Ok(());
    }
    let present = engine
        .image_exists(&config.image)
        .await
        .context("Failed to query the container engine for the sandbox image")?;
    if !present {
        bail!(
            "Image {} not found locally; pull it first with `docker pull {}`",
            config.image,
            config.image
        );
    }
    Ok(())
}

/// Print a result and map it to the process exit status.
fn report(result: &ExecutionResult, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("failed to encode result: {e}"),
        }
    } else {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
    }
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[derive(Serialize)]
struct ToolListing {
    tool: Tool,
    network: bool,
    memory_limit: String,
    cpu_limit: f64,
    time_budget_secs: u64,
    actions: Vec<&'static str>,
}

fn tool_listing() -> Vec<ToolListing> {
    Tool::ALL
        .into_iter()
        .map(|tool| {
            let policy = tool.policy();
            ToolListing {
                tool,
                network: policy.network_enabled(),
                memory_limit: policy.memory_limit().to_string(),
                cpu_limit: policy.cpu_limit(),
                time_budget_secs: policy.time_budget().as_secs(),
                actions: ActionKind::ALL
                    .into_iter()
                    .filter(|a| a.tool() == tool)
                    .map(|a| a.name())
                    .collect(),
            }
        })
        .collect()
}

fn cmd_tools(json: bool) -> Result<ExitCode> {
    let listing = tool_listing();
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(ExitCode::SUCCESS);
    }

    for entry in &listing {
        println!(
            "{:<11} network={:<5} memory={:<3} cpus={} budget={}s",
            entry.tool.name(),
            entry.network,
            entry.memory_limit,
            entry.cpu_limit,
            entry.time_budget_secs
        );
        for action in &entry.actions {
            println!("    {action}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
