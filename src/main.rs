use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use conductor_config::{FlowDef, GlobalConfig};
use conductor_engine::{EngineConfig, EngineError, FlowEngine};
use conductor_executor::Executors;
use conductor_registry::Registry;
use conductor_remote_log::RemoteLogger;
use conductor_resolver::{Resolver, StandardResolver};
use conductor_state::SharedState;
use conductor_trace::TraceEntry;
use conductor_workflow::Flow;
use serde_json::Value as Json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Configuration-driven flow orchestrator.
#[derive(Parser)]
#[command(name = "conductor")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a flow to completion.
  Run {
    /// Resource reference to the flow definition (`alias://`, URL, or path).
    #[arg(long)]
    flow: String,
    /// Resource reference to the global configuration.
    #[arg(long)]
    global_config: String,
    /// Seed payload as inline JSON.
    #[arg(long)]
    payload: Option<String>,
    /// Seed payload read from a file, or `-` for stdin.
    #[arg(long)]
    payload_file: Option<String>,
    /// Write the completed trace to this path as a JSON array.
    #[arg(long)]
    trace_file: Option<PathBuf>,
    /// Print the shared-state snapshot to stderr after the run.
    #[arg(long)]
    print_state: bool,
    /// Print the full trace to stderr after the run.
    #[arg(long)]
    print_trace: bool,
    /// Suppress the terminal_outputs JSON normally printed to stdout.
    #[arg(long)]
    no_print_results: bool,
  },
  /// Render a flow, and optionally a prior trace, as Mermaid.
  Diagram {
    /// Resource reference to the flow definition.
    #[arg(long)]
    flow: String,
    /// A trace file previously written by `run --trace-file`.
    #[arg(long)]
    trace_file: Option<PathBuf>,
    /// Annotate each node label with run stats.
    #[arg(long)]
    include_metadata: bool,
    /// Print `conductor_mermaid::summary` to stderr alongside the diagram.
    #[arg(long)]
    print_summary: bool,
  },
}

/// Which exit code a failure maps to: 0 on a completed run regardless of
/// node-level error statuses, 2 on configuration/resolution errors, 1 on
/// engine-internal failures.
enum ExitKind {
  Config,
  Internal,
}

struct CliFailure {
  kind: ExitKind,
  source: anyhow::Error,
}

impl CliFailure {
  fn config(source: impl Into<anyhow::Error>) -> Self {
    Self {
      kind: ExitKind::Config,
      source: source.into(),
    }
  }

  fn internal(source: impl Into<anyhow::Error>) -> Self {
    Self {
      kind: ExitKind::Internal,
      source: source.into(),
    }
  }
}

impl From<conductor_config::ConfigError> for CliFailure {
  fn from(e: conductor_config::ConfigError) -> Self {
    CliFailure::config(e)
  }
}

impl From<conductor_workflow::FlowError> for CliFailure {
  fn from(e: conductor_workflow::FlowError) -> Self {
    CliFailure::config(e)
  }
}

impl From<conductor_resolver::ResolveError> for CliFailure {
  fn from(e: conductor_resolver::ResolveError) -> Self {
    CliFailure::config(e)
  }
}

impl From<EngineError> for CliFailure {
  fn from(e: EngineError) -> Self {
    match e {
      EngineError::InvalidFlow(_) | EngineError::UnresolvedCallable(_, _) => {
        CliFailure::config(e)
      }
      EngineError::NodeNotFound(_) | EngineError::DispatchPanicked(_) => CliFailure::internal(e),
    }
  }
}

impl From<std::io::Error> for CliFailure {
  fn from(e: std::io::Error) -> Self {
    CliFailure::internal(e)
  }
}

impl From<serde_json::Error> for CliFailure {
  fn from(e: serde_json::Error) -> Self {
    CliFailure::config(e)
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();
  let runtime = match tokio::runtime::Runtime::new() {
    Ok(rt) => rt,
    Err(e) => {
      eprintln!("error: failed to start tokio runtime: {e}");
      std::process::exit(1);
    }
  };

  let result = runtime.block_on(async move {
    match cli.command {
      Commands::Run {
        flow,
        global_config,
        payload,
        payload_file,
        trace_file,
        print_state,
        print_trace,
        no_print_results,
      } => {
        run_flow(
          flow,
          global_config,
          payload,
          payload_file,
          trace_file,
          print_state,
          print_trace,
          no_print_results,
        )
        .await
      }
      Commands::Diagram {
        flow,
        trace_file,
        include_metadata,
        print_summary,
      } => diagram_flow(flow, trace_file, include_metadata, print_summary).await,
    }
  });

  if let Err(failure) = result {
    eprintln!("error: {:#}", failure.source);
    std::process::exit(match failure.kind {
      ExitKind::Config => 2,
      ExitKind::Internal => 1,
    });
  }
}

async fn load_flow_def(reference: &str) -> Result<FlowDef, CliFailure> {
  let resolver = StandardResolver::new(Default::default());
  let path = resolver.resolve(reference).await?;
  conductor_config::load(&path).map_err(CliFailure::from)
}

async fn load_global_config(reference: &str) -> Result<GlobalConfig, CliFailure> {
  let resolver = StandardResolver::new(Default::default());
  let path = resolver.resolve(reference).await?;
  conductor_config::load(&path).map_err(CliFailure::from)
}

fn read_payload(payload: Option<String>, payload_file: Option<String>) -> Result<Json, CliFailure> {
  if let Some(inline) = payload {
    return serde_json::from_str(&inline).map_err(CliFailure::from);
  }
  if let Some(path) = payload_file {
    let raw = if path == "-" {
      let mut input = String::new();
      io::stdin().read_to_string(&mut input)?;
      input
    } else {
      std::fs::read_to_string(&path)?
    };
    if raw.trim().is_empty() {
      return Ok(Json::Null);
    }
    return serde_json::from_str(&raw).map_err(CliFailure::from);
  }
  if !io::stdin().is_terminal() {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if !input.trim().is_empty() {
      return serde_json::from_str(&input).map_err(CliFailure::from);
    }
  }
  Ok(Json::Null)
}

/// Seeds the process environment from `global.env` before any node runs.
/// Edition 2024 requires `unsafe` for direct env mutation — see
/// `conductor_executor`'s per-node overlay guard for the narrower,
/// restorable version of this same operation.
fn apply_global_env(global: &GlobalConfig) {
  for (key, value) in &global.env {
    unsafe {
      std::env::set_var(key, value);
    }
  }
}

#[allow(clippy::too_many_arguments)]
async fn run_flow(
  flow_ref: String,
  global_config_ref: String,
  payload: Option<String>,
  payload_file: Option<String>,
  trace_file: Option<PathBuf>,
  print_state: bool,
  print_trace: bool,
  no_print_results: bool,
) -> Result<(), CliFailure> {
  let run_id = uuid::Uuid::new_v4();
  info!(%run_id, flow = %flow_ref, "starting run");

  let global = load_global_config(&global_config_ref).await?;
  apply_global_env(&global);
  let flow_def = load_flow_def(&flow_ref).await?;
  let flow = Arc::new(Flow::lock(flow_def)?);
  let seed_payload = read_payload(payload, payload_file)?;

  let remote_logger = RemoteLogger::new(global.remote_logging.clone()).map_err(CliFailure::internal)?;
  remote_logger
    .log(
      "info",
      "flow run started",
      serde_json::json!({"run_id": run_id.to_string(), "flow": flow.name}),
    )
    .await;

  // The CLI has no dynamic `module:function` loader (no such mechanism
  // exists for compiled Rust) — the registry starts empty. A concrete
  // deployment registers its node implementations at start-up before
  // constructing `Executors`; this entrypoint is a thin driver over that
  // registration, not the registration itself.
  let registry = Registry::new();
  let executors = Executors::new(registry, global.process_pool_size);
  let state = SharedState::new(global.shared_state.clone());
  let engine_config = EngineConfig {
    max_concurrency: global.max_concurrency,
    default_timeout_secs: 30.0,
  };
  let engine = FlowEngine::new(executors, engine_config);

  for dependency in &global.dependencies {
    info!(%dependency, "dependency installation is out of scope for this entrypoint; skipping");
  }

  let run_result = engine.run(flow, seed_payload, state).await?;

  remote_logger
    .log(
      "info",
      "flow run completed",
      serde_json::json!({
        "run_id": run_id.to_string(),
        "terminal_nodes": run_result.terminal_outputs.len(),
      }),
    )
    .await;

  if let Some(path) = trace_file {
    let serialised = serde_json::to_string_pretty(&run_result.trace)?;
    std::fs::write(&path, serialised)?;
  }

  if print_state {
    eprintln!(
      "state: {}",
      serde_json::to_string_pretty(&run_result.shared_state_snapshot)?
    );
  }
  if print_trace {
    eprintln!("trace: {}", serde_json::to_string_pretty(&run_result.trace)?);
  }
  if !no_print_results {
    println!(
      "{}",
      serde_json::to_string_pretty(&run_result.terminal_outputs)?
    );
  }

  Ok(())
}

async fn diagram_flow(
  flow_ref: String,
  trace_file: Option<PathBuf>,
  include_metadata: bool,
  print_summary: bool,
) -> Result<(), CliFailure> {
  let flow_def = load_flow_def(&flow_ref).await?;
  let flow = Flow::lock(flow_def)?;

  let trace: Vec<TraceEntry> = match trace_file {
    Some(path) => {
      let raw = std::fs::read_to_string(&path)?;
      serde_json::from_str(&raw)?
    }
    None => Vec::new(),
  };

  println!("{}", conductor_mermaid::render(&flow, &trace, include_metadata));

  if print_summary {
    let summary = conductor_mermaid::summary(&trace);
    match serde_json::to_string_pretty(&summary) {
      Ok(rendered) => eprintln!("summary: {rendered}"),
      Err(e) => warn!(error = %e, "failed to render trace summary"),
    }
  }

  Ok(())
}
