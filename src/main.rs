mod project;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use verbena_compiler::ScriptCompiler;
use verbena_engine::WorkflowEngine;
use verbena_function::Function;
use verbena_runtime::FunctionLoader;

use crate::project::ProjectDef;

/// Verbena - a workflow engine for user-authored Lua functions
#[derive(Parser)]
#[command(name = "verbena")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.verbena)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a function source file into a bytecode artifact
  Compile {
    /// Path to the Lua source file
    source_file: PathBuf,

    /// Entry point, e.g. "Math.Add"
    #[arg(long)]
    entry: String,
  },

  /// Check a function source file for diagnostics without emitting anything
  Validate {
    /// Path to the Lua source file
    source_file: PathBuf,
  },

  /// Run a workflow from a project file
  Run {
    /// Path to the project file (JSON)
    project_file: PathBuf,

    /// The workflow ID to execute (default: first in the project)
    #[arg(long)]
    workflow: Option<String>,

    /// Initial variables as a JSON object
    #[arg(long)]
    vars: Option<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".verbena")
  });

  match cli.command {
    Some(Commands::Compile { source_file, entry }) => compile(source_file, entry, data_dir),
    Some(Commands::Validate { source_file }) => validate(source_file, data_dir),
    Some(Commands::Run {
      project_file,
      workflow,
      vars,
    }) => run(project_file, workflow, vars, data_dir),
    None => {
      println!("verbena - use --help to see available commands");
      Ok(())
    }
  }
}

fn compile(source_file: PathBuf, entry: String, data_dir: PathBuf) -> Result<()> {
  let source = std::fs::read_to_string(&source_file)
    .with_context(|| format!("failed to read source file: {}", source_file.display()))?;
  let name = source_file
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "function".to_string());

  let compiler = artifact_compiler(&data_dir)?;
  let mut function = Function::new(name, source, entry);
  let outcome = compiler.compile(&mut function);

  print_diagnostics(&outcome.diagnostics);
  match outcome.artifact_path {
    Some(path) => {
      println!("compiled: {}", path.display());
      Ok(())
    }
    None => bail!("compilation failed"),
  }
}

fn validate(source_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let source = std::fs::read_to_string(&source_file)
    .with_context(|| format!("failed to read source file: {}", source_file.display()))?;

  let compiler = artifact_compiler(&data_dir)?;
  let diagnostics = compiler.validate(&source);
  if diagnostics.is_empty() {
    println!("no issues found");
    Ok(())
  } else {
    print_diagnostics(&diagnostics);
    bail!("validation failed");
  }
}

fn run(
  project_file: PathBuf,
  workflow_id: Option<String>,
  vars: Option<String>,
  data_dir: PathBuf,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_async(project_file, workflow_id, vars, data_dir).await })
}

async fn run_async(
  project_file: PathBuf,
  workflow_id: Option<String>,
  vars: Option<String>,
  data_dir: PathBuf,
) -> Result<()> {
  let project_content = tokio::fs::read_to_string(&project_file)
    .await
    .with_context(|| format!("failed to read project file: {}", project_file.display()))?;
  let project: ProjectDef = serde_json::from_str(&project_content)
    .with_context(|| format!("failed to parse project file: {}", project_file.display()))?;

  eprintln!("Loaded project: {}", project.name);

  let initial_variables: HashMap<String, serde_json::Value> = match vars {
    Some(raw) => serde_json::from_str(&raw).context("failed to parse --vars as a JSON object")?,
    None => HashMap::new(),
  };

  // Compile and load every function in the project.
  let compiler = artifact_compiler(&data_dir)?;
  let loader = Arc::new(FunctionLoader::new());
  let mut functions = project.build_functions();
  for function in &mut functions {
    let outcome = compiler.compile(function);
    print_diagnostics(&outcome.diagnostics);
    if !outcome.success {
      bail!("function '{}' failed to compile", function.name);
    }
    loader
      .load_function(function)
      .with_context(|| format!("failed to load function '{}'", function.name))?;
  }

  let workflow = project.resolve_workflow(workflow_id.as_deref(), &functions)?;
  eprintln!("Executing workflow '{}' with {} nodes", workflow.name, workflow.nodes.len());

  let engine = WorkflowEngine::new(loader);
  let cancel = CancellationToken::new();

  // Ctrl-C cancels the run cooperatively; the finished context still prints.
  let ctrlc_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrlc_cancel.cancel();
    }
  });

  let context = engine.execute(&workflow, Some(initial_variables), cancel).await;

  println!("{}", serde_json::to_string_pretty(&context)?);

  if let Some(error) = &context.error_message {
    bail!("workflow execution failed: {error}");
  }
  if context.is_cancelled {
    bail!("workflow execution cancelled");
  }
  Ok(())
}

fn artifact_compiler(data_dir: &std::path::Path) -> Result<ScriptCompiler> {
  ScriptCompiler::new(data_dir.join("artifacts")).context("failed to create artifact directory")
}

fn print_diagnostics(diagnostics: &[verbena_function::CompileDiagnostic]) {
  for diagnostic in diagnostics {
    eprintln!(
      "{:?} {} at {}:{}: {}",
      diagnostic.severity, diagnostic.code, diagnostic.line, diagnostic.column, diagnostic.message
    );
  }
}
