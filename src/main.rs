use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use flowpump_config::ProjectDef;
use flowpump_graph::Project;
use flowpump_runtime::{ExecutorRegistry, Runtime, RuntimeConfig, RuntimeRunner};

/// Flowpump - A flow graph execution engine
#[derive(Parser)]
#[command(name = "flowpump")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a project
  Run {
    /// Path to the project file (JSON)
    project_file: PathBuf,

    /// Start with the debugger active and paused
    #[arg(long)]
    debug: bool,

    /// Pump until no work is left instead of waiting for Ctrl-C
    #[arg(long)]
    until_idle: bool,

    /// Upper bound on pump cycles with --until-idle
    #[arg(long, default_value_t = 10_000)]
    max_cycles: usize,
  },

  /// Load and validate a project without running it
  Validate {
    /// Path to the project file (JSON)
    project_file: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Some(Commands::Run {
      project_file,
      debug,
      until_idle,
      max_cycles,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_project(project_file, debug, until_idle, max_cycles))?;
    }
    Some(Commands::Validate { project_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(validate_project(project_file))?;
    }
    None => {
      println!("flowpump - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load_project(project_file: &Path) -> Result<Project> {
  let content = tokio::fs::read_to_string(project_file)
    .await
    .with_context(|| format!("failed to read project file: {}", project_file.display()))?;

  let def: ProjectDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse project file: {}", project_file.display()))?;

  Project::from_def(def).with_context(|| format!("invalid project: {}", project_file.display()))
}

async fn validate_project(project_file: PathBuf) -> Result<()> {
  let project = load_project(&project_file).await?;

  println!("Project: {}", project.name);
  println!("Pages: {}", project.pages.len());
  println!("Actions: {}", project.actions.len());
  println!("Variables: {}", project.variables.len());

  Ok(())
}

async fn run_project(
  project_file: PathBuf,
  debug: bool,
  until_idle: bool,
  max_cycles: usize,
) -> Result<()> {
  let project = Arc::new(load_project(&project_file).await?);
  eprintln!("Loaded project: {}", project.name);

  let config = RuntimeConfig {
    project_path: Some(project_file),
    debugger_active: debug,
    ..RuntimeConfig::default()
  };
  let mut runtime = Runtime::new(project, ExecutorRegistry::with_builtins(), config);
  runtime.start().await.context("failed to start runtime")?;

  let runtime = if until_idle {
    let cycles = runtime.run_until_idle(max_cycles).await;
    eprintln!("Pump cycles: {cycles}");
    runtime.stop().await;
    runtime
  } else {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        ctrl_c.cancel();
      }
    });

    eprintln!("Running, press Ctrl-C to stop");
    RuntimeRunner::new(runtime)
      .start(cancel)
      .await
      .context("runtime runner failed")?
  };

  for item in runtime.logs().items() {
    println!("[{:?}] {}", item.level, item.label());
  }

  if let Some(error) = runtime.error() {
    bail!("runtime stopped with error: {error}");
  }

  Ok(())
}
