use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use verbena_function::{CompileDiagnostic, CompileStatus, Function};
use verbena_script::function_vm;

use crate::diagnostics::{diagnostic_from_lua, synthetic};

/// Result of a compile attempt.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
  pub success: bool,
  /// Artifact location, present only on success.
  pub artifact_path: Option<PathBuf>,
  /// Diagnostics of severity warning or above.
  pub diagnostics: Vec<CompileDiagnostic>,
}

/// Compiles function source into loadable bytecode artifacts.
///
/// Stateless apart from the private output directory artifacts are written
/// into. Each compile emits a uniquely-named artifact so a reload sees a
/// fresh file rather than an overwritten one.
pub struct ScriptCompiler {
  output_dir: PathBuf,
}

impl ScriptCompiler {
  /// Create a compiler writing artifacts under `output_dir`.
  pub fn new(output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
    let output_dir = output_dir.into();
    fs::create_dir_all(&output_dir)?;
    Ok(Self { output_dir })
  }

  /// Directory compiled artifacts are written into.
  pub fn output_dir(&self) -> &Path {
    &self.output_dir
  }

  /// Compile a function's source into a bytecode artifact.
  ///
  /// The entity is updated in place: artifact path, compile status,
  /// last-compiled timestamp and diagnostics, the latter replaced wholesale.
  /// On any error the artifact is removed and the status recorded as
  /// `Failed`; nothing is ever raised across this boundary.
  pub fn compile(&self, function: &mut Function) -> CompileOutcome {
    let artifact_name = format!(
      "function_{}_{}.luac",
      function.id,
      Utc::now().format("%Y%m%d%H%M%S")
    );
    let artifact_path = self.output_dir.join(artifact_name);

    let outcome = match self.emit(&function.source, &function.name, &artifact_path) {
      Ok(()) => CompileOutcome {
        success: true,
        artifact_path: Some(artifact_path),
        diagnostics: Vec::new(),
      },
      Err(diagnostic) => {
        // A failed attempt must not leave a partial artifact behind.
        if artifact_path.exists() {
          let _ = fs::remove_file(&artifact_path);
        }
        CompileOutcome {
          success: false,
          artifact_path: None,
          diagnostics: vec![diagnostic],
        }
      }
    };

    function.diagnostics = outcome.diagnostics.clone();
    if outcome.success {
      function.artifact_path = outcome.artifact_path.clone();
      function.compile_status = CompileStatus::Compiled;
      function.last_compiled_at = Some(Utc::now());
      info!(function_id = %function.id, name = %function.name, "function_compiled");
    } else {
      function.compile_status = CompileStatus::Failed;
      warn!(function_id = %function.id, name = %function.name, "function_compile_failed");
    }

    outcome
  }

  /// Check source for diagnostics without emitting an artifact or touching
  /// any function entity. Used for live editor feedback.
  pub fn validate(&self, source: &str) -> Vec<CompileDiagnostic> {
    match compile_source(source, "validate") {
      Ok(_) => Vec::new(),
      Err(diagnostic) => vec![diagnostic],
    }
  }

  fn emit(&self, source: &str, name: &str, artifact_path: &Path) -> Result<(), CompileDiagnostic> {
    let bytecode = compile_source(source, name)?;
    fs::write(artifact_path, bytecode)
      .map_err(|e| synthetic(format!("compilation failed: {e}")))
  }
}

/// Compile source text in a fresh pinned-stdlib VM without executing it.
///
/// Returns the dumped bytecode of the chunk. Debug information is kept so
/// runtime errors still carry source positions.
fn compile_source(source: &str, name: &str) -> Result<Vec<u8>, CompileDiagnostic> {
  let lua = function_vm().map_err(|e| synthetic(format!("compilation failed: {e}")))?;
  let entry = lua
    .load(source)
    .set_name(name)
    .into_function()
    .map_err(diagnostic_from_lua)?;
  Ok(entry.dump(false))
}
