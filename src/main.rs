use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use weft_actions::{ActionProvider, FactoryRegistry};
use weft_config::EngineConfig;
use weft_engine::{
  ChannelNotifier, ExecutionNotifier, FragmentEvent, FragmentExecution, FragmentsEngine, Node,
  TaskEngine,
};
use weft_fragment::{ClientRequest, Fragment};
use weft_resolver::{Resolver, StandardResolver, Tasks};

/// Weft - runs fragment task graphs
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a batch of fragments through their tasks
  Run {
    /// Path to the engine configuration (JSON)
    config_file: PathBuf,

    /// Read the fragments array from this file instead of stdin
    #[arg(long)]
    fragments: Option<PathBuf>,

    /// Request path visible to actions
    #[arg(long, default_value = "/")]
    path: String,

    /// Request parameter as NAME=VALUE, repeatable
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Request header as NAME=VALUE, repeatable
    #[arg(long = "header", value_name = "NAME=VALUE")]
    headers: Vec<String>,

    /// Print engine events to stderr while running
    #[arg(long)]
    events: bool,
  },

  /// List configured tasks and actions
  Tasks {
    /// Path to the engine configuration (JSON)
    config_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      config_file,
      fragments,
      path,
      params,
      headers,
      events,
    }) => {
      let request = build_request(path, &params, &headers)?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run(config_file, fragments, request, events).await })?;
    }
    Some(Commands::Tasks { config_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(list_tasks(&config_file))?;
    }
    None => {
      println!("weft - use --help to see available commands");
    }
  }

  Ok(())
}

fn read_config(config_file: &Path) -> Result<EngineConfig> {
  let content = std::fs::read_to_string(config_file)
    .with_context(|| format!("failed to read config file: {}", config_file.display()))?;
  EngineConfig::from_json(&content)
    .with_context(|| format!("failed to parse config file: {}", config_file.display()))
}

async fn run(
  config_file: PathBuf,
  fragments_file: Option<PathBuf>,
  request: ClientRequest,
  events: bool,
) -> Result<()> {
  let config = read_config(&config_file)?;

  let tasks = resolve_tasks(&config).await?;

  let fragments = match fragments_file {
    Some(file) => {
      let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read fragments file: {}", file.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse fragments file: {}", file.display()))?
    }
    None => read_fragments_from_stdin()?,
  };
  let executions = assign_tasks(&tasks, fragments);

  let results = if events {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
      while let Some(event) = receiver.recv().await {
        if let Ok(line) = serde_json::to_string(&event) {
          eprintln!("{line}");
        }
      }
    });
    let engine = FragmentsEngine::with_engine(TaskEngine::with_notifier(ChannelNotifier::new(sender)));
    let results = execute(engine, executions, request).await;
    // the engine owned the last sender, so the printer drains and stops
    printer.await.context("event printer failed")?;
    results?
  } else {
    execute(FragmentsEngine::new(), executions, request).await?
  };

  println!("{}", serde_json::to_string_pretty(&results)?);
  Ok(())
}

async fn execute<N: ExecutionNotifier + 'static>(
  engine: FragmentsEngine<N>,
  executions: Vec<FragmentExecution>,
  request: ClientRequest,
) -> Result<Vec<FragmentEvent>> {
  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  let watcher = tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling fragment runs");
      on_interrupt.cancel();
    }
  });

  let results = engine
    .execute_with_cancel(executions, request, cancel)
    .await
    .context("fragment execution failed");
  watcher.abort();
  results
}

fn assign_tasks(tasks: &Tasks, fragments: Vec<Fragment>) -> Vec<FragmentExecution> {
  fragments
    .into_iter()
    .map(|fragment| {
      let task = tasks.for_fragment(&fragment);
      FragmentExecution::new(fragment, task)
    })
    .collect()
}

async fn list_tasks(config_file: &Path) -> Result<()> {
  let config = read_config(config_file)?;
  let tasks = resolve_tasks(&config).await?;

  println!("tasks:");
  for name in tasks.names() {
    let nodes: Vec<&str> = tasks
      .get(name)
      .map(|task| task.graph().nodes().map(Node::id).collect())
      .unwrap_or_default();
    println!("  {name}: {}", nodes.join(", "));
  }
  println!("actions:");
  for (alias, options) in &config.actions {
    match &options.do_action {
      Some(inner) => println!("  {alias} ({}) -> {inner}", options.factory),
      None => println!("  {alias} ({})", options.factory),
    }
  }
  Ok(())
}

async fn resolve_tasks(config: &EngineConfig) -> Result<Tasks> {
  let provider = ActionProvider::new(
    config.actions.clone(),
    Arc::new(FactoryRegistry::with_defaults()),
  );
  let resolver = StandardResolver::new(provider);
  let tasks = resolver
    .resolve_all(config)
    .await
    .context("failed to resolve tasks")?;
  info!(tasks = tasks.len(), "tasks_resolved");
  Ok(tasks)
}

fn build_request(path: String, params: &[String], headers: &[String]) -> Result<ClientRequest> {
  let mut request = ClientRequest::new(path);
  for param in params {
    let (name, value) = split_pair(param)?;
    request = request.with_param(name, value);
  }
  for header in headers {
    let (name, value) = split_pair(header)?;
    request = request.with_header(name, value);
  }
  Ok(request)
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
  match pair.split_once('=') {
    Some((name, value)) if !name.is_empty() => Ok((name, value)),
    _ => bail!("expected NAME=VALUE, got '{pair}'"),
  }
}

fn read_fragments_from_stdin() -> Result<Vec<Fragment>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, nothing to run
    Ok(Vec::new())
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read fragments from stdin")?;

    if input.trim().is_empty() {
      Ok(Vec::new())
    } else {
      serde_json::from_str(&input).context("failed to parse fragments JSON from stdin")
    }
  }
}
